//! Raw packet transports.
//!
//! A [`Transport`] sends one [`Probe`] and waits for the packet that answers
//! it. Handles are opened per probe (or per probe sequence) through a
//! [`TransportFactory`] and released on drop, so concurrent probes never
//! share a socket.
//!
//! IPv4 sends through an `IPPROTO_RAW` channel with a hand-built header and
//! listens on layer-3 channels for the probed protocol and ICMP. IPv6 lets
//! the kernel build the header and captures whole frames on the interface
//! owning the routed source, which is the only way to see hop limit and
//! traffic class of replies.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use netprobe_common::error::ProbeError;
use netprobe_protocols::probe::Probe;
use netprobe_protocols::reply::{self, CapturedFrame, Reply};
use netprobe_protocols::{ethernet, icmp};
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::packet::Packet;
use pnet::packet::ethernet::EtherTypes;
use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::transport::{
    self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender,
};
use pnet::util::MacAddr;
use tracing::{debug, trace};

use crate::network::interface;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const IPPROTO_RAW: IpNextHeaderProtocol = IpNextHeaderProtocol(255);
/// Upper bound on a single blocking read so several receivers can be polled.
const POLL_SLICE: Duration = Duration::from_millis(20);
const CAPTURE_READ_TIMEOUT: Duration = Duration::from_millis(50);

pub trait Transport: Send {
    fn send(&mut self, probe: &Probe) -> Result<(), ProbeError>;

    /// Waits up to `wait` for a packet that answers `probe`. Unrelated
    /// traffic is skipped.
    fn recv_reply(&mut self, probe: &Probe, wait: Duration) -> Result<Option<Reply>, ProbeError>;

    fn exchange(&mut self, probe: &Probe, wait: Duration) -> Result<Option<Reply>, ProbeError> {
        self.send(probe)?;
        self.recv_reply(probe, wait)
    }
}

pub trait TransportFactory: Send + Sync {
    /// Opens a transport able to probe `target` with the given IP protocol.
    fn open(&self, target: IpAddr, protocol: u8) -> Result<Box<dyn Transport>, ProbeError>;

    /// Fails with [`ProbeError::PermissionDenied`] when raw sockets are not
    /// available to this process.
    fn check_privileges(&self, target: IpAddr) -> Result<(), ProbeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PnetTransportFactory;

impl TransportFactory for PnetTransportFactory {
    fn open(&self, target: IpAddr, protocol: u8) -> Result<Box<dyn Transport>, ProbeError> {
        let source: IpAddr = interface::route_source(target)?;
        match (source, target) {
            (IpAddr::V4(src), IpAddr::V4(_)) => Ok(Box::new(Ipv4Transport::open(src, protocol)?)),
            (IpAddr::V6(src), IpAddr::V6(_)) => Ok(Box::new(Ipv6Transport::open(src, protocol)?)),
            _ => Err(ProbeError::NoInterface(target.to_string())),
        }
    }

    fn check_privileges(&self, target: IpAddr) -> Result<(), ProbeError> {
        let channel_type: TransportChannelType = match target {
            IpAddr::V4(_) => TransportChannelType::Layer3(IPPROTO_RAW),
            IpAddr::V6(_) => TransportChannelType::Layer4(TransportProtocol::Ipv6(
                IpNextHeaderProtocol(icmp::PROTOCOL_NUMBER_V6),
            )),
        };
        open_channel(channel_type).map(|_| ())
    }
}

fn open_channel(
    channel_type: TransportChannelType,
) -> Result<(TransportSender, TransportReceiver), ProbeError> {
    let (tx, rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, channel_type)?;
    Ok((tx, rx))
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

fn packet_error(err: anyhow::Error) -> ProbeError {
    ProbeError::Packet(format!("{err:#}"))
}

/// Bytes handed to a layer-4 channel as-is.
struct RawPayload<'a>(&'a [u8]);

impl Packet for RawPayload<'_> {
    fn packet(&self) -> &[u8] {
        self.0
    }

    fn payload(&self) -> &[u8] {
        &[]
    }
}

// ---------------------------------------------------------------- IPv4 ----

pub struct Ipv4Transport {
    source: Ipv4Addr,
    tx: TransportSender,
    receivers: Vec<TransportReceiver>,
}

impl Ipv4Transport {
    pub fn open(source: Ipv4Addr, protocol: u8) -> Result<Self, ProbeError> {
        let (tx, _) = open_channel(TransportChannelType::Layer3(IPPROTO_RAW))?;
        let mut receivers: Vec<TransportReceiver> = Vec::new();
        for listen in listen_protocols(protocol) {
            let channel_type = TransportChannelType::Layer3(IpNextHeaderProtocol(listen));
            match open_channel(channel_type) {
                Ok((_, rx)) => receivers.push(rx),
                Err(e) if e.is_permission() => return Err(e),
                Err(e) => debug!("No receiver for protocol {listen}: {e}"),
            }
        }
        Ok(Self { source, tx, receivers })
    }
}

/// Protocols worth a receive socket when probing `protocol`. 0 and 255
/// cannot be bound on every platform; their replies arrive as ICMP anyway.
fn listen_protocols(protocol: u8) -> Vec<u8> {
    let mut protocols: Vec<u8> = vec![icmp::PROTOCOL_NUMBER_V4];
    if !matches!(protocol, 0 | 255) && protocol != icmp::PROTOCOL_NUMBER_V4 {
        protocols.insert(0, protocol);
    }
    protocols
}

impl Transport for Ipv4Transport {
    fn send(&mut self, probe: &Probe) -> Result<(), ProbeError> {
        let bytes: Vec<u8> = probe.ipv4_packet(self.source).map_err(packet_error)?;
        let packet = pnet::packet::ipv4::Ipv4Packet::new(&bytes)
            .ok_or_else(|| ProbeError::Packet(String::from("ipv4 buffer too short")))?;
        self.tx.send_to(packet, probe.target)?;
        trace!("Sent protocol {} probe to {}", probe.protocol(), probe.target);
        Ok(())
    }

    fn recv_reply(&mut self, probe: &Probe, wait: Duration) -> Result<Option<Reply>, ProbeError> {
        let deadline: Instant = Instant::now() + wait;
        if self.receivers.is_empty() {
            std::thread::sleep(wait);
            return Ok(None);
        }
        loop {
            for rx in self.receivers.iter_mut() {
                let remaining: Duration = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Ok(None);
                }
                let mut iter = transport::ipv4_packet_iter(rx);
                match iter.next_with_timeout(remaining.min(POLL_SLICE)) {
                    Ok(Some((packet, _))) => {
                        if let Some(reply) = reply::parse_ipv4(packet.packet())
                            && reply.answers(probe)
                        {
                            return Ok(Some(reply));
                        }
                    }
                    Ok(None) => {}
                    Err(e) if is_timeout(&e) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

// ---------------------------------------------------------------- IPv6 ----

/// Layer-2 handle on the interface that owns the routed source.
struct Capture {
    local_mac: MacAddr,
    tx: Box<dyn DataLinkSender>,
    rx: Box<dyn DataLinkReceiver>,
    /// Link address of the last peer that answered us, used as next hop for
    /// spoofed sends.
    peer_mac: Option<MacAddr>,
}

pub struct Ipv6Transport {
    source: Ipv6Addr,
    tx: TransportSender,
    capture: Capture,
}

impl Ipv6Transport {
    pub fn open(source: Ipv6Addr, protocol: u8) -> Result<Self, ProbeError> {
        let channel_type = TransportChannelType::Layer4(TransportProtocol::Ipv6(IpNextHeaderProtocol(protocol)));
        let (tx, _) = open_channel(channel_type)?;
        let intf: NetworkInterface = interface::interface_for_source(IpAddr::V6(source))?;
        let (eth_tx, eth_rx) =
            open_eth_channel(&intf, &capture_config(), datalink::channel).map_err(|e| {
                match e.downcast::<io::Error>() {
                    Ok(io_err) => ProbeError::from(io_err),
                    Err(other) => ProbeError::NoInterface(format!("{other:#}")),
                }
            })?;
        debug!("Capturing IPv6 replies on {}", intf.name);
        let capture = Capture {
            local_mac: intf.mac.unwrap_or_else(MacAddr::zero),
            tx: eth_tx,
            rx: eth_rx,
            peer_mac: None,
        };
        Ok(Self { source, tx, capture })
    }

    fn send_framed(&mut self, probe: &Probe) -> Result<(), ProbeError> {
        let peer_mac: MacAddr = self.capture.peer_mac.ok_or_else(|| {
            ProbeError::Packet(String::from("no next-hop link address learned for spoofed send"))
        })?;
        let packet: Vec<u8> = probe.ipv6_packet(self.source).map_err(packet_error)?;
        let frame: Vec<u8> =
            ethernet::create_frame(self.capture.local_mac, peer_mac, EtherTypes::Ipv6, &packet)
                .map_err(packet_error)?;
        match self.capture.tx.send_to(&frame, None) {
            Some(result) => Ok(result?),
            None => Err(ProbeError::Packet(String::from("datalink send buffer unavailable"))),
        }
    }
}

impl Transport for Ipv6Transport {
    fn send(&mut self, probe: &Probe) -> Result<(), ProbeError> {
        if probe.spoofed_source.is_some() {
            return self.send_framed(probe);
        }
        let payload: Vec<u8> = probe
            .transport_payload(IpAddr::V6(self.source))
            .map_err(packet_error)?;
        self.tx.send_to(RawPayload(&payload), probe.target)?;
        trace!("Sent protocol {} probe to {}", probe.protocol(), probe.target);
        Ok(())
    }

    fn recv_reply(&mut self, probe: &Probe, wait: Duration) -> Result<Option<Reply>, ProbeError> {
        let deadline: Instant = Instant::now() + wait;
        while Instant::now() < deadline {
            let captured: Option<CapturedFrame> = match self.capture.rx.next() {
                Ok(frame) => reply::parse_ethernet(frame),
                Err(e) if is_timeout(&e) => None,
                Err(e) => return Err(e.into()),
            };
            if let Some(frame) = captured
                && frame.reply.answers(probe)
            {
                self.capture.peer_mac = Some(frame.src_mac);
                return Ok(Some(frame.reply));
            }
        }
        Ok(None)
    }
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> anyhow::Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let ch: Channel = channel_opener(intf, *cfg).with_context(|| format!("opening on {}", intf.name))?;
    match ch {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        _ => bail!("non-ethernet channel for {}", intf.name),
    }
}

fn capture_config() -> Config {
    Config {
        read_timeout: Some(CAPTURE_READ_TIMEOUT),
        ..Default::default()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
