use std::{
    io,
    thread::{self, JoinHandle},
};

use crossbeam_channel::Sender;

use crate::{error::Error, instance::InstanceId, registry::SharedRegistry};

#[derive(Debug)]
pub enum Event {
    /// Config loaded, with errors of instances which can't be reached
    Loaded(Vec<(InstanceId, Error)>),
    LoadFailed(String),
}

/// Initial load of the registry, run in its own thread. Registry lock is held until the
/// load is finished so no mutation can happen meanwhile.
pub struct Loader {
    registry: SharedRegistry,
    event_sender: Sender<Event>,
}

impl Loader {
    pub fn new(registry: SharedRegistry, event_sender: Sender<Event>) -> Self {
        Self {
            registry,
            event_sender,
        }
    }

    pub fn start(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("config_loader".to_string())
            .spawn(move || self.execute())
    }

    pub fn execute(&self) {
        let event = match self.registry.lock() {
            Ok(mut registry) => match registry.load() {
                Ok(_) => Event::Loaded(registry.take_errors()),
                Err(error) => Event::LoadFailed(format!("{}", error)),
            },
            Err(error) => Event::LoadFailed(format!("Unable to lock registry : {}", error)),
        };

        if let Err(error) = self.event_sender.send(event) {
            log::error!("Channel communication error during config loader : {}", error)
        }
    }
}
