#![allow(dead_code)]

use driver_api::testing::{Caps, FakePlatform};
use e1000::testing::FakeE1000;
use netmux::{Coordinator, DbufToken, E1000Config, NetConfig, Reply, Request, Target};
use std::sync::Arc;

pub const CAPS: &Caps = &Caps::NETWORK;

pub fn mac(slot: u8) -> [u8; 6] {
    [0x52, 0x54, 0x00, 0x00, 0x00, slot]
}

pub struct Adapter {
    pub hw: Arc<FakeE1000>,
    pub line: u8,
}

pub struct Bed {
    pub fake: FakePlatform,
    pub adapters: Vec<Adapter>,
    pub netc: Coordinator,
}

impl Bed {
    /// Plugs one adapter per entry of `stalled`, stalled ones never finish reset.
    pub fn new(stalled: &[bool], depth: usize) -> Self {
        let fake = FakePlatform::new();
        let adapters = stalled
            .iter()
            .zip(0..)
            .map(|(&stalled, slot)| {
                let (hw, _function, line) = FakeE1000::plug(&fake, slot, mac(slot));
                if stalled {
                    hw.stall_reset();
                }
                Adapter { hw, line }
            })
            .collect();

        let config = NetConfig {
            e1000: E1000Config {
                rx_ring: depth,
                tx_ring: depth,
                ..E1000Config::default()
            },
            ..NetConfig::default()
        };
        let netc = netmux::init_with(&fake.platform(), config).unwrap();
        Self {
            fake,
            adapters,
            netc,
        }
    }

    /// Opens and starts interface 0.
    pub fn running(depth: usize) -> Self {
        let bed = Self::new(&[false], depth);
        bed.netc.open(CAPS, Target::Coordinator).unwrap();
        bed.netc.open(CAPS, Target::Interface(0)).unwrap();
        bed.request(Request::Start).unwrap();
        bed
    }

    pub fn request(&self, request: Request) -> netmux::NetResult<Reply> {
        self.netc.control(CAPS, Target::Interface(0), request)
    }

    /// Interrupt of interface 0's adapter.
    pub fn fire(&self) -> bool {
        self.fake.irq.fire(self.adapters[0].line)
    }

    /// Gets a buffer, fills it and queues it for transmission.
    pub fn send(&self, fill: u8, length: usize) -> (DbufToken, netmux::NetResult<Reply>) {
        let Ok(Reply::Buffer(token)) = self.request(Request::TxDqbuf) else {
            panic!("no transmit buffer");
        };
        self.netc
            .write_buffer(CAPS, Target::Interface(0), token, &vec![fill; length])
            .unwrap();
        (token, self.request(Request::TxQbuf { token, length }))
    }
}
