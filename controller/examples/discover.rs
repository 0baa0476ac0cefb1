//! Minimal end-to-end walkthrough without real hardware: a stub network
//! backend prints outbound frames, and we inject a synthetic ENTITY_AVAILABLE
//! advertisement to watch discovery kick off an enumeration.
//!
//! With a real layer-2 backend, implement `AvbNetwork` over AF_PACKET/BPF
//! and wire its receive callback to `handle.frame_sender().deliver`.

use std::time::Duration;

use avdecc_controller::constants::AVDECC_MULTICAST_MAC;
use avdecc_controller::message::adp::{AdpMessageType, Adpdu, EntityCapabilities};
use avdecc_controller::system::System;
use avdecc_controller::transport::AvbNetwork;
use avdecc_controller::{Controller, ControllerConfig, EntityId, Error, LogLevel, Mac};

struct StdoutNetwork {
    mac: Mac,
}

impl AvbNetwork for StdoutNetwork {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), Error> {
        println!("tx {} bytes: {:02x?}...", frame.len(), &frame[..20]);
        Ok(())
    }

    fn local_mac(&self) -> Mac {
        self.mac
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let local_mac = Mac(0x0022_4466_8899);
    let controller = Controller::new(
        Box::new(StdoutNetwork { mac: local_mac }),
        ControllerConfig {
            log_level: LogLevel::Debug,
            ..ControllerConfig::default()
        },
    );
    let (system, handle) = System::new(controller);
    let runner = tokio::spawn(system.run());

    // Pretend an AVB end station advertised itself.
    let mut advertisement = Adpdu::discover(EntityId::ZERO);
    advertisement.message_type = AdpMessageType::EntityAvailable;
    advertisement.entity_id = EntityId(0x0011_22FF_FE33_4455);
    advertisement.entity_capabilities = EntityCapabilities::AEM_SUPPORTED;
    advertisement.valid_time = 31;
    advertisement.available_index = 1;
    handle
        .frame_sender()
        .deliver(&advertisement.to_frame(AVDECC_MULTICAST_MAC, Mac(0x0011_2233_4455)));

    tokio::time::sleep(Duration::from_millis(100)).await;

    for station in handle.snapshot().await.expect("snapshot") {
        println!(
            "end station {} at {} ({:?}), {} descriptors",
            station.entity_id, station.mac, station.state, station.descriptor_count
        );
    }
    while let Some(log) = handle.logs().pop() {
        println!("[{:?}] {}", log.level, log.message);
    }

    handle.shutdown().await;
    let _ = runner.await;
}
