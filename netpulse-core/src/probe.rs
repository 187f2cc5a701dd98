// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! The RTT prober: UDP exchange loop, convergence detection, stop signal.
//!
//! One run exchanges datagrams with an echo peer over blocking sockets and
//! tracks the minimum observed round-trip time. The run converges when a
//! configured number of consecutive measurements fail to beat that minimum,
//! at which point the peer is told to stop echoing.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::{ProbeRequest, ProbeSettings};
use crate::error::{ProbeError, ProbeResult};
use crate::phase::TimeoutSchedule;
use crate::recorder::{SampleRecorder, PLACEHOLDER_KEY};
use crate::sample::{ProbeSample, RttSummary};

/// Payload of the terminal datagram.
pub const STOP_PAYLOAD: &[u8] = b"stop";

const RECV_BUFFER_SIZE: usize = 1024;

/// Result of one probe run. Returned once, immutable.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    /// Wall-clock duration of the whole run in seconds; 0.0 when socket
    /// setup failed and no exchange ever ran.
    pub measured_seconds: f64,
    /// Key of the exported artifact, or the placeholder when none was
    /// produced.
    pub artifact_key: String,
    /// Round-trip statistics over the recorded series, when any exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_summary: Option<RttSummary>,
    /// Diagnostic for setup failures and aborted runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Verdict of feeding one measured round trip into the probe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RttVerdict {
    /// The minimum is judged stable; terminate the exchange.
    Converged,
    /// Keep probing.
    Continue,
}

/// Mutable state of one probe run.
///
/// Owned by the loop that drives the run and never shared, so concurrent
/// or repeated runs are independent.
#[derive(Debug)]
pub struct ProbeState {
    attempt_index: u32,
    consecutive_timeouts: u32,
    min_rtt_nanos: Option<i64>,
    non_improving_streak: u32,
    convergence_threshold: u32,
}

impl ProbeState {
    /// Create state for a run. A zero threshold is treated as 1.
    pub fn new(convergence_threshold: u32) -> Self {
        Self {
            attempt_index: 0,
            consecutive_timeouts: 0,
            min_rtt_nanos: None,
            non_improving_streak: 0,
            convergence_threshold: convergence_threshold.max(1),
        }
    }

    pub fn attempt_index(&self) -> u32 {
        self.attempt_index
    }

    pub fn consecutive_timeouts(&self) -> u32 {
        self.consecutive_timeouts
    }

    pub fn min_rtt_nanos(&self) -> Option<i64> {
        self.min_rtt_nanos
    }

    pub fn non_improving_streak(&self) -> u32 {
        self.non_improving_streak
    }

    /// Record a failed exchange. Returns true when the failure threshold is
    /// reached and the run must abort.
    pub fn record_timeout(&mut self, failure_threshold: u32) -> bool {
        self.attempt_index += 1;
        self.consecutive_timeouts += 1;
        self.consecutive_timeouts >= failure_threshold
    }

    /// Feed one measured round trip into the convergence logic.
    ///
    /// A measurement at or below the current minimum (or the first one
    /// ever) adopts the minimum and resets the streak; a strictly larger
    /// one advances the streak toward the threshold.
    pub fn observe_rtt(&mut self, rtt_nanos: i64) -> RttVerdict {
        match self.min_rtt_nanos {
            Some(min) if rtt_nanos > min => {
                self.non_improving_streak += 1;
                if self.non_improving_streak >= self.convergence_threshold {
                    return RttVerdict::Converged;
                }
            }
            _ => {
                self.min_rtt_nanos = Some(rtt_nanos);
                self.non_improving_streak = 0;
            }
        }

        RttVerdict::Continue
    }

    /// Close out a successful attempt.
    pub fn complete_attempt(&mut self) {
        self.attempt_index += 1;
        self.consecutive_timeouts = 0;
    }
}

struct ProbeSockets {
    send: UdpSocket,
    recv: UdpSocket,
    peer: SocketAddr,
}

struct LoopExit {
    samples: Vec<ProbeSample>,
    aborted: bool,
}

/// Drives probe runs against an echo peer.
pub struct Prober {
    settings: ProbeSettings,
    recorder: SampleRecorder,
}

impl Prober {
    pub fn new(settings: ProbeSettings, recorder: SampleRecorder) -> Self {
        Self { settings, recorder }
    }

    /// Run one probe.
    ///
    /// Never returns an error: socket setup failures are folded into a
    /// diagnostic outcome with no measurement, and an unreachable peer is
    /// reported through the outcome message.
    pub fn run(&self, req: &ProbeRequest) -> ProbeOutcome {
        let started = Instant::now();
        tracing::info!(
            peer_address = %req.peer_address,
            peer_port = %req.peer_port,
            request_id = %req.request_id,
            "Starting probe exchange"
        );

        let exit = self
            .setup_sockets(req)
            .and_then(|sockets| self.exchange_loop(&sockets, req, started));

        let exit = match exit {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!(error = %e, "Probe could not run");
                return ProbeOutcome {
                    measured_seconds: 0.0,
                    artifact_key: PLACEHOLDER_KEY.to_string(),
                    rtt_summary: None,
                    message: Some(format!("unable to run probe: {}", e)),
                };
            }
        };

        // No artifact for an aborted run, debug or not.
        let artifact_key = if exit.aborted {
            PLACEHOLDER_KEY.to_string()
        } else {
            self.recorder
                .export(&req.request_id, &exit.samples, req.debug)
        };

        let message = exit.aborted.then(|| {
            format!(
                "peer unreachable: {} consecutive receive timeouts",
                self.settings.failure_threshold
            )
        });

        ProbeOutcome {
            measured_seconds: started.elapsed().as_secs_f64(),
            artifact_key,
            rtt_summary: RttSummary::from_samples(&exit.samples),
            message,
        }
    }

    fn setup_sockets(&self, req: &ProbeRequest) -> ProbeResult<ProbeSockets> {
        let peer = (req.peer_address.as_str(), req.peer_port.value())
            .to_socket_addrs()
            .map_err(|e| ProbeError::Setup {
                context: "resolving peer address",
                source: e,
            })?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| ProbeError::PeerUnresolvable {
                address: req.peer_address.clone(),
                port: req.peer_port.value(),
            })?;

        let send = UdpSocket::bind(("0.0.0.0", 0)).map_err(|e| ProbeError::Setup {
            context: "binding send socket",
            source: e,
        })?;
        let recv = bind_reusable(req.effective_listen_port().value())?;

        Ok(ProbeSockets { send, recv, peer })
    }

    fn exchange_loop(
        &self,
        sockets: &ProbeSockets,
        req: &ProbeRequest,
        clock: Instant,
    ) -> ProbeResult<LoopExit> {
        let payload = req.request_id.as_bytes();
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let mut schedule = TimeoutSchedule::new(&self.settings);
        let mut state = ProbeState::new(req.convergence_threshold());
        let mut samples = Vec::new();

        set_receive_timeout(&sockets.recv, schedule.current_timeout())?;

        while state.attempt_index() < self.settings.max_attempts {
            let (send_ns, recv_ns) = match exchange(sockets, payload, &mut buf, clock) {
                Ok(stamps) => stamps,
                Err(e) => {
                    if is_timeout(&e) {
                        tracing::debug!(
                            attempt = state.attempt_index(),
                            phase = %schedule.phase(),
                            "Receive timed out"
                        );
                    } else {
                        // A failed exchange leaves no usable timestamps;
                        // count it like a timeout so the convergence step
                        // never runs against stale data.
                        tracing::warn!(
                            attempt = state.attempt_index(),
                            error = %e,
                            "Exchange failed"
                        );
                    }

                    if state.record_timeout(self.settings.failure_threshold) {
                        tracing::error!(
                            timeouts = state.consecutive_timeouts(),
                            "Peer unreachable, aborting run"
                        );
                        return Ok(LoopExit {
                            samples,
                            aborted: true,
                        });
                    }
                    continue;
                }
            };

            // The 0th exchange is a warm-up: it seeds the minimum below but
            // never enters the exported series.
            if state.attempt_index() > 0 {
                samples.push(ProbeSample {
                    attempt_index: state.attempt_index(),
                    send_timestamp_nanos: send_ns,
                    receive_timestamp_nanos: recv_ns,
                });
            }

            if state.observe_rtt(recv_ns - send_ns) == RttVerdict::Converged {
                tracing::info!(
                    attempt = state.attempt_index(),
                    min_rtt_ns = state.min_rtt_nanos().unwrap_or_default(),
                    "Round-trip time converged"
                );
                self.send_stop(sockets);
                return Ok(LoopExit {
                    samples,
                    aborted: false,
                });
            }

            state.complete_attempt();
            if schedule.widen() {
                set_receive_timeout(&sockets.recv, schedule.current_timeout())?;
            }
        }

        tracing::warn!(
            attempts = state.attempt_index(),
            "Attempt cap reached before convergence"
        );
        Ok(LoopExit {
            samples,
            aborted: false,
        })
    }

    /// Best-effort terminal datagram; the measurement stands either way.
    fn send_stop(&self, sockets: &ProbeSockets) {
        if let Err(e) = sockets.send.send_to(STOP_PAYLOAD, sockets.peer) {
            tracing::warn!(error = %e, "Failed to send stop signal");
        }
    }
}

/// One send/receive pair, with timestamps taken immediately around it.
fn exchange(
    sockets: &ProbeSockets,
    payload: &[u8],
    buf: &mut [u8],
    clock: Instant,
) -> io::Result<(i64, i64)> {
    let send_ns = monotonic_nanos(clock);
    sockets.send.send_to(payload, sockets.peer)?;
    let (len, _) = sockets.recv.recv_from(buf)?;
    let recv_ns = monotonic_nanos(clock);
    tracing::trace!(len, "Echo received");
    Ok((send_ns, recv_ns))
}

fn monotonic_nanos(clock: Instant) -> i64 {
    clock.elapsed().as_nanos() as i64
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn set_receive_timeout(socket: &UdpSocket, timeout: Duration) -> ProbeResult<()> {
    socket
        .set_read_timeout(Some(timeout))
        .map_err(|e| ProbeError::Setup {
            context: "arming receive timeout",
            source: e,
        })
}

/// Bind a UDP socket with `SO_REUSEADDR`, so back-to-back runs can reclaim
/// the fixed receive port immediately.
fn bind_reusable(port: u16) -> ProbeResult<UdpSocket> {
    use nix::sys::socket::{
        bind, setsockopt, socket, sockopt::ReuseAddr, AddressFamily, SockFlag, SockType, SockaddrIn,
    };

    let fd = socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::empty(),
        None,
    )
    .map_err(|e| ProbeError::Setup {
        context: "creating receive socket",
        source: e.into(),
    })?;

    setsockopt(&fd, ReuseAddr, &true).map_err(|e| ProbeError::Setup {
        context: "configuring receive socket",
        source: e.into(),
    })?;

    bind(fd.as_raw_fd(), &SockaddrIn::new(0, 0, 0, 0, port)).map_err(|e| ProbeError::Setup {
        context: "binding receive socket",
        source: e.into(),
    })?;

    Ok(UdpSocket::from(fd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_success_adopts_minimum() {
        let mut state = ProbeState::new(3);
        assert_eq!(state.observe_rtt(10_000), RttVerdict::Continue);
        assert_eq!(state.min_rtt_nanos(), Some(10_000));
        assert_eq!(state.non_improving_streak(), 0);
    }

    #[test]
    fn test_equal_rtt_adopts_and_resets_streak() {
        // RTTs 10ms, 10ms, 15ms with threshold 1: the equal measurement
        // does not advance the streak, the larger one converges.
        let mut state = ProbeState::new(1);
        assert_eq!(state.observe_rtt(10_000_000), RttVerdict::Continue);
        assert_eq!(state.observe_rtt(10_000_000), RttVerdict::Continue);
        assert_eq!(state.non_improving_streak(), 0);
        assert_eq!(state.observe_rtt(15_000_000), RttVerdict::Converged);
    }

    #[test]
    fn test_improvement_resets_streak() {
        let mut state = ProbeState::new(2);
        assert_eq!(state.observe_rtt(10_000), RttVerdict::Continue);
        assert_eq!(state.observe_rtt(15_000), RttVerdict::Continue);
        assert_eq!(state.non_improving_streak(), 1);

        // A new minimum discards the accumulated streak.
        assert_eq!(state.observe_rtt(9_000), RttVerdict::Continue);
        assert_eq!(state.min_rtt_nanos(), Some(9_000));
        assert_eq!(state.non_improving_streak(), 0);

        assert_eq!(state.observe_rtt(12_000), RttVerdict::Continue);
        assert_eq!(state.observe_rtt(13_000), RttVerdict::Converged);
    }

    #[test]
    fn test_zero_threshold_behaves_as_one() {
        let mut state = ProbeState::new(0);
        assert_eq!(state.observe_rtt(10_000), RttVerdict::Continue);
        assert_eq!(state.observe_rtt(11_000), RttVerdict::Converged);
    }

    #[test]
    fn test_timeout_counting_reaches_threshold() {
        let mut state = ProbeState::new(1);
        for _ in 0..4 {
            assert!(!state.record_timeout(5));
        }
        assert!(state.record_timeout(5));
        assert_eq!(state.attempt_index(), 5);
        assert_eq!(state.consecutive_timeouts(), 5);
    }

    #[test]
    fn test_success_resets_timeout_streak() {
        let mut state = ProbeState::new(1);
        assert!(!state.record_timeout(5));
        assert!(!state.record_timeout(5));

        state.complete_attempt();
        assert_eq!(state.consecutive_timeouts(), 0);
        assert_eq!(state.attempt_index(), 3);
    }

    #[test]
    fn test_is_timeout_kinds() {
        assert!(is_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_timeout(&io::Error::from(
            io::ErrorKind::ConnectionRefused
        )));
    }

    #[test]
    fn test_outcome_serialization_skips_empty_fields() {
        let outcome = ProbeOutcome {
            measured_seconds: 1.25,
            artifact_key: PLACEHOLDER_KEY.to_string(),
            rtt_summary: None,
            message: None,
        };

        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"measured_seconds\":1.25"));
        assert!(json.contains(PLACEHOLDER_KEY));
        assert!(!json.contains("rtt_summary"));
        assert!(!json.contains("message"));
    }

    #[test]
    fn test_bind_reusable_ephemeral() {
        // Port 0 asks the kernel for an ephemeral port.
        let socket = bind_reusable(0).unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }
}
