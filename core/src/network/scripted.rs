//! An in-memory [`TransportFactory`] that answers probes from a closure.
//!
//! Used to exercise scanners without raw sockets: the responder sees every
//! probe sent (spoofed ones included) and decides what comes back.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use netprobe_common::error::ProbeError;
use netprobe_protocols::probe::{Probe, ProbeKind};
use netprobe_protocols::reply::{IcmpReply, Quoted, Reply, ReplyLayer, TcpReply, UdpReply};
use netprobe_protocols::{icmp, tcp, udp};

use crate::network::transport::{Transport, TransportFactory};

type Responder = dyn Fn(&Probe) -> Result<Option<Reply>, ProbeError> + Send + Sync;

#[derive(Clone)]
pub struct ScriptedFactory {
    responder: Arc<Responder>,
    sent: Arc<Mutex<Vec<Probe>>>,
    privileged: bool,
}

impl ScriptedFactory {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Probe) -> Result<Option<Reply>, ProbeError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            sent: Arc::new(Mutex::new(Vec::new())),
            privileged: true,
        }
    }

    /// A factory that never answers.
    pub fn silent() -> Self {
        Self::new(|_| Ok(None))
    }

    /// Refuses both the privilege check and every `open`.
    pub fn unprivileged(mut self) -> Self {
        self.privileged = false;
        self
    }

    /// Every probe sent so far, in send order.
    pub fn sent(&self) -> Vec<Probe> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn denied() -> ProbeError {
        ProbeError::PermissionDenied(String::from("Operation not permitted"))
    }
}

impl TransportFactory for ScriptedFactory {
    fn open(&self, _target: IpAddr, _protocol: u8) -> Result<Box<dyn Transport>, ProbeError> {
        if !self.privileged {
            return Err(Self::denied());
        }
        Ok(Box::new(ScriptedTransport {
            responder: Arc::clone(&self.responder),
            sent: Arc::clone(&self.sent),
            pending: None,
        }))
    }

    fn check_privileges(&self, _target: IpAddr) -> Result<(), ProbeError> {
        match self.privileged {
            true => Ok(()),
            false => Err(Self::denied()),
        }
    }
}

struct ScriptedTransport {
    responder: Arc<Responder>,
    sent: Arc<Mutex<Vec<Probe>>>,
    pending: Option<Reply>,
}

impl Transport for ScriptedTransport {
    fn send(&mut self, probe: &Probe) -> Result<(), ProbeError> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(*probe);
        self.pending = (self.responder)(probe)?;
        Ok(())
    }

    fn recv_reply(&mut self, probe: &Probe, _wait: Duration) -> Result<Option<Reply>, ProbeError> {
        Ok(self.pending.take().filter(|reply| reply.answers(probe)))
    }
}

fn local_for(target: IpAddr) -> IpAddr {
    match target {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)),
    }
}

/// A reply from the probe target carrying `layer`.
pub fn reply_from(probe: &Probe, protocol: u8, layer: ReplyLayer) -> Reply {
    Reply {
        source: probe.target,
        destination: local_for(probe.target),
        protocol,
        ttl: 64,
        ip_id: probe.target.is_ipv4().then_some(1),
        traffic_class: probe.target.is_ipv6().then_some(0),
        dont_fragment: probe.target.is_ipv4(),
        layer,
    }
}

/// TCP segment answering a TCP probe with mirrored ports.
pub fn tcp_answer(probe: &Probe, flags: u8, window: u16) -> Reply {
    let (src_port, dst_port) = probe.ports().unwrap_or((0, 0));
    let layer = ReplyLayer::Tcp(TcpReply { src_port: dst_port, dst_port: src_port, flags, window });
    reply_from(probe, tcp::PROTOCOL_NUMBER, layer)
}

pub fn udp_answer(probe: &Probe) -> Reply {
    let (src_port, dst_port) = probe.ports().unwrap_or((0, 0));
    let layer = ReplyLayer::Udp(UdpReply { src_port: dst_port, dst_port: src_port });
    reply_from(probe, udp::PROTOCOL_NUMBER, layer)
}

/// ICMP(v6) echo reply to an echo probe.
pub fn echo_answer(probe: &Probe) -> Reply {
    let identifier: Option<u16> = match probe.kind {
        ProbeKind::Echo { identifier, .. } => Some(identifier),
        _ => None,
    };
    let v6: bool = probe.is_ipv6();
    let icmp_type: u8 = if v6 { icmp::types::ECHO_REPLY_V6 } else { icmp::types::ECHO_REPLY_V4 };
    let layer = ReplyLayer::Icmp(IcmpReply { v6, icmp_type, code: 0, echo_identifier: identifier, quoted: None });
    reply_from(probe, probe.protocol(), layer)
}

/// ICMP(v6) error quoting `probe`, sent by the target itself.
pub fn icmp_error(probe: &Probe, icmp_type: u8, code: u8) -> Reply {
    let v6: bool = probe.is_ipv6();
    let quoted = Quoted { protocol: probe.protocol(), destination: probe.target, ports: probe.ports() };
    let layer = ReplyLayer::Icmp(IcmpReply { v6, icmp_type, code, echo_identifier: None, quoted: Some(quoted) });
    let protocol: u8 = if v6 { icmp::PROTOCOL_NUMBER_V6 } else { icmp::PROTOCOL_NUMBER_V4 };
    reply_from(probe, protocol, layer)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use netprobe_protocols::tcp::flags;

    const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 50));

    #[test]
    fn scripted_answers_match_their_probe() {
        let probe = Probe::tcp(TARGET, 80, flags::SYN);
        assert!(tcp_answer(&probe, flags::SYN_ACK, 1024).answers(&probe));

        let udp = Probe::udp(TARGET, 53);
        assert!(udp_answer(&udp).answers(&udp));
        assert!(icmp_error(&udp, 3, 3).answers(&udp));

        let echo = Probe::echo(TARGET);
        assert!(echo_answer(&echo).answers(&echo));
    }

    #[test]
    fn transport_records_and_replays() {
        let factory = ScriptedFactory::new(|probe| Ok(Some(tcp_answer(probe, flags::RST_ACK, 0))));
        let mut transport = factory.open(TARGET, 6).unwrap();
        let probe = Probe::tcp(TARGET, 443, flags::SYN);

        let reply = transport.exchange(&probe, Duration::from_millis(1)).unwrap();
        assert_eq!(reply.unwrap().tcp().unwrap().flags, flags::RST_ACK);
        assert!(transport.recv_reply(&probe, Duration::from_millis(1)).unwrap().is_none());
        assert_eq!(factory.sent(), vec![probe]);
    }

    #[test]
    fn unprivileged_factory_refuses() {
        let factory = ScriptedFactory::silent().unprivileged();
        assert!(factory.check_privileges(TARGET).unwrap_err().is_permission());
        assert!(factory.open(TARGET, 6).is_err());
    }
}
