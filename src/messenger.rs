//! Glue layer: send a single frame, or run a cancellable listen loop with optional filtering and
//! DBC decode. This is the component most callers interact with.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::dbc::Dbc;
use crate::error::Error;
use crate::filter::Filter;
use crate::frame::{Endianness, Frame};
use crate::socket::{CanSocket, SocketAdapter};

/// Opens a `SocketAdapter` for an interface name. The default, `LinuxCanFactory`, opens a real
/// SocketCAN socket; tests substitute their own factory to exercise the listen loop without
/// hardware, per the "optional adapter injection" design this crate inherited from the corpus's
/// own socket-wrapping structs.
pub trait SocketFactory: Send + Sync {
    fn open(
        &self,
        interface: &str,
        fd_enabled: bool,
        read_timeout: Duration,
    ) -> Result<Box<dyn SocketAdapter>, Error>;
}

pub struct LinuxCanFactory;

impl SocketFactory for LinuxCanFactory {
    fn open(
        &self,
        interface: &str,
        fd_enabled: bool,
        read_timeout: Duration,
    ) -> Result<Box<dyn SocketAdapter>, Error> {
        Ok(Box::new(CanSocket::open(interface, fd_enabled, read_timeout)?))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MessengerOptions {
    pub endianness: Endianness,
    pub fd: bool,
    pub read_timeout: Duration,
}

impl Default for MessengerOptions {
    fn default() -> Self {
        MessengerOptions {
            endianness: Endianness::Big,
            fd: false,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// A frame delivered to a `listen` callback, with an optional DBC-decoded view attached.
pub struct ReceivedFrame {
    pub frame: Frame,
    pub decoded: Option<(String, HashMap<String, f64>)>,
}

pub struct Messenger {
    interface_name: String,
    options: MessengerOptions,
    factory: Box<dyn SocketFactory>,
    listening: Arc<AtomicBool>,
}

impl Messenger {
    pub fn new(interface_name: &str, options: MessengerOptions) -> Self {
        Messenger::with_factory(interface_name, options, Box::new(LinuxCanFactory))
    }

    pub fn with_factory(
        interface_name: &str,
        options: MessengerOptions,
        factory: Box<dyn SocketFactory>,
    ) -> Self {
        Messenger {
            interface_name: interface_name.to_string(),
            options,
            factory,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Builds and sends a single frame. Scoped socket acquisition: opened, written, released.
    /// `InvalidLength` (a codec error) propagates; socket-open and transport failures are logged
    /// and swallowed, since they indicate transient bus/hardware trouble rather than caller bugs.
    pub fn send_raw(
        &self,
        id: u32,
        data: &[u8],
        extended: bool,
        fd: Option<bool>,
    ) -> Result<(), Error> {
        let fd = fd.unwrap_or(self.options.fd);
        let frame = Frame::new(id, data, extended, fd)?;

        let socket = match self
            .factory
            .open(&self.interface_name, fd, self.options.read_timeout)
        {
            Ok(socket) => socket,
            Err(e) => {
                log::error!(
                    "send_raw: failed to open socket on {:?}: {}",
                    self.interface_name,
                    e
                );
                return Ok(());
            }
        };

        if let Err(e) = socket.write_frame(&frame.to_bytes(self.options.endianness)) {
            log::error!("send_raw: write failed: {}", e);
        }

        Ok(())
    }

    /// Encodes `values` against `dbc`'s message `message_name`, then `send_raw`s the result.
    /// `UnknownMessage`/`SignalOutOfRange`/`SignalExceedsMessage` propagate from the DBC encode.
    pub fn send_with_dbc(
        &self,
        dbc: &Dbc,
        message_name: &str,
        values: &HashMap<String, f64>,
        extended: bool,
        fd: Option<bool>,
    ) -> Result<(), Error> {
        let (id, data) = dbc.encode_can(message_name, values)?;
        self.send_raw(id, &data, extended, fd)
    }

    /// Requests the running listen loop to stop. Idempotent; observed at the loop's next
    /// iteration boundary (after at most one receive-timeout tick).
    pub fn stop_listening(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    /// Runs a blocking receive loop until `stop_listening` is called. Re-entrant: calling
    /// `listen` again after a prior `stop_listening` resumes normal behavior.
    ///
    /// The only fatal condition is failing to open the socket at entry, which is logged and
    /// returns without invoking `callback`. Parse, filter-rejection, and callback failures are
    /// all logged and the loop continues.
    pub fn listen<F>(
        &self,
        filter: Option<Filter>,
        fd: Option<bool>,
        dbc: Option<&Dbc>,
        mut callback: F,
    ) where
        F: FnMut(&ReceivedFrame) -> Result<(), Box<dyn std::error::Error + Send + Sync>>,
    {
        let filter = filter.unwrap_or(Filter::None);
        let fd = fd.unwrap_or(self.options.fd);

        let socket = match self
            .factory
            .open(&self.interface_name, fd, self.options.read_timeout)
        {
            Ok(socket) => socket,
            Err(e) => {
                log::error!(
                    "listen: failed to open socket on {:?}: {}",
                    self.interface_name,
                    e
                );
                return;
            }
        };

        self.listening.store(true, Ordering::SeqCst);

        while self.listening.load(Ordering::SeqCst) {
            let bytes = match socket.read_frame(fd) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    log::error!("listen: read failed: {}", e);
                    continue;
                }
            };

            let frame = match Frame::parse(&bytes, self.options.endianness, Some(fd)) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("listen: failed to parse frame: {}", e);
                    continue;
                }
            };

            if !filter.matches(frame.id()) {
                continue;
            }

            let decoded = match dbc {
                Some(dbc) => match dbc.decode_can(frame.id(), frame.data()) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        log::warn!("listen: DBC decode failed for id {:#x}: {}", frame.id(), e);
                        None
                    }
                },
                None => None,
            };

            let received = ReceivedFrame { frame, decoded };
            if let Err(e) = callback(&received) {
                log::error!("listen: {}", Error::CallbackError(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct MockAdapter {
        frames: Mutex<Vec<Vec<u8>>>,
    }

    impl SocketAdapter for MockAdapter {
        fn write_frame(&self, _bytes: &[u8]) -> Result<(), Error> {
            Ok(())
        }

        fn read_frame(&self, _fd_enabled: bool) -> Result<Option<Vec<u8>>, Error> {
            let mut frames = self.frames.lock().unwrap();
            Ok(frames.pop())
        }
    }

    struct MockFactory {
        frames: Vec<Vec<u8>>,
    }

    impl SocketFactory for MockFactory {
        fn open(
            &self,
            _interface: &str,
            _fd_enabled: bool,
            _read_timeout: Duration,
        ) -> Result<Box<dyn SocketAdapter>, Error> {
            Ok(Box::new(MockAdapter {
                frames: Mutex::new(self.frames.clone()),
            }))
        }
    }

    fn classic_frame_bytes(id: u32) -> Vec<u8> {
        Frame::new(id, &[], false, false)
            .unwrap()
            .to_bytes(Endianness::Big)
    }

    #[test]
    fn s9_filter_drops_and_delivers() {
        // order is significant: MockAdapter pops from the back, so 0x150 is read first.
        let frames = vec![classic_frame_bytes(0x300), classic_frame_bytes(0x150)];
        let messenger = Messenger::with_factory(
            "mock0",
            MessengerOptions::default(),
            Box::new(MockFactory { frames }),
        );

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let delivered_clone = delivered.clone();
        let listening = messenger.listening.clone();

        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            listening.store(false, Ordering::SeqCst);
        });

        messenger.listen(
            Some(Filter::Range(0x100, 0x200)),
            None,
            None,
            move |received| {
                delivered_clone.lock().unwrap().push(received.frame.id());
                Ok(())
            },
        );

        // only the in-range frame reaches the callback; the 0x300 frame is filtered out.
        assert_eq!(*delivered.lock().unwrap(), vec![0x150]);
    }

    #[test]
    fn s8_cancellation_on_timeout_only() {
        let messenger = Messenger::with_factory(
            "mock0",
            MessengerOptions::default(),
            Box::new(MockFactory { frames: vec![] }),
        );

        let listening = messenger.listening.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        // timeout-only adapter: stop after a couple of empty polls via a side channel.
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            listening.store(false, Ordering::SeqCst);
        });

        messenger.listen(None, None, None, move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reentrant_after_stop() {
        let messenger = Messenger::with_factory(
            "mock0",
            MessengerOptions::default(),
            Box::new(MockFactory {
                frames: vec![classic_frame_bytes(0x1)],
            }),
        );

        let listening = messenger.listening.clone();
        let seen = Arc::new(Mutex::new(0));
        let seen_clone = seen.clone();
        messenger.listen(None, None, None, move |_| {
            *seen_clone.lock().unwrap() += 1;
            listening.store(false, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(*seen.lock().unwrap(), 1);

        // re-entry: listening flag must flip back to true and the loop must run again.
        let listening2 = messenger.listening.clone();
        let seen2 = Arc::new(Mutex::new(0));
        let seen2_clone = seen2.clone();
        messenger.listen(None, None, None, move |_| {
            *seen2_clone.lock().unwrap() += 1;
            listening2.store(false, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(*seen2.lock().unwrap(), 1);
    }
}
