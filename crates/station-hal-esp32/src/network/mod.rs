//! Wi-Fi connectivity state shared between the association loop and the HTTP server.

use core::{
    net::Ipv4Addr,
    sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering},
};

/// High-level connectivity state for logs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ConnectivityState {
    Disconnected = 0,
    Connecting = 1,
    LinkUpNoIp = 2,
    Connected = 3,
}

impl ConnectivityState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::LinkUpNoIp,
            3 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

/// Wi-Fi credentials source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
}

impl WifiConfig {
    pub const fn new(ssid: &'static str, password: &'static str) -> Self {
        Self { ssid, password }
    }
}

/// Immutable connectivity snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectivitySnapshot {
    pub state: ConnectivityState,
    pub link_up: bool,
    pub address: Option<Ipv4Addr>,
    pub revision: u32,
}

impl ConnectivitySnapshot {
    /// Ready to serve: link up with a DHCP lease.
    pub const fn is_serving(self) -> bool {
        self.link_up && self.address.is_some()
    }
}

/// Lock-free shared connectivity status.
#[derive(Debug)]
pub struct ConnectivityHandle {
    state: AtomicU8,
    link_up: AtomicBool,
    /// IPv4 address as big-endian bits, `0` when unassigned.
    address: AtomicU32,
    revision: AtomicU32,
}

impl ConnectivityHandle {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectivityState::Disconnected as u8),
            link_up: AtomicBool::new(false),
            address: AtomicU32::new(0),
            revision: AtomicU32::new(0),
        }
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        let bits = self.address.load(Ordering::Acquire);
        ConnectivitySnapshot {
            state: ConnectivityState::from_raw(self.state.load(Ordering::Acquire)),
            link_up: self.link_up.load(Ordering::Acquire),
            address: (bits != 0).then(|| Ipv4Addr::from_bits(bits)),
            revision: self.revision.load(Ordering::Acquire),
        }
    }

    pub fn mark_connecting(&self) {
        if self.store_state(ConnectivityState::Connecting) {
            self.bump_revision();
        }
    }

    pub fn mark_disconnected(&self) {
        let mut changed = false;
        changed |= self.link_up.swap(false, Ordering::AcqRel);
        changed |= self.address.swap(0, Ordering::AcqRel) != 0;
        changed |= self.store_state(ConnectivityState::Disconnected);
        if changed {
            self.bump_revision();
        }
    }

    pub fn update_link(&self, link_up: bool, address: Option<Ipv4Addr>) {
        let bits = address.map_or(0, Ipv4Addr::to_bits);
        let mut changed = false;
        changed |= self.link_up.swap(link_up, Ordering::AcqRel) != link_up;
        changed |= self.address.swap(bits, Ordering::AcqRel) != bits;
        changed |= self.store_state(Self::state_for(link_up, bits != 0));
        if changed {
            self.bump_revision();
        }
    }

    fn state_for(link_up: bool, has_ipv4: bool) -> ConnectivityState {
        if !link_up {
            ConnectivityState::Disconnected
        } else if !has_ipv4 {
            ConnectivityState::LinkUpNoIp
        } else {
            ConnectivityState::Connected
        }
    }

    fn store_state(&self, next: ConnectivityState) -> bool {
        self.state.swap(next as u8, Ordering::AcqRel) != next as u8
    }

    fn bump_revision(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for ConnectivityHandle {
    fn default() -> Self {
        Self::new()
    }
}
