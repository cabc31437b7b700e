//! Single-slot handoff between the echo OUT handler and the service loop.

/// Pending-transfer mailbox for the echo path.
///
/// The OUT completion handler stages the length of the packet it just read;
/// the service loop takes the value only after the corresponding IN write
/// succeeds. A busy write leaves the slot staged, so the packet is retried
/// on the next iteration: at-least-once delivery, no duplication.
///
/// There is one producer (the OUT handler) and one consumer (the service
/// loop), and both run in the same synchronous call chain, so no atomics
/// are involved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EchoSlot {
    pending: Option<usize>,
}

impl EchoSlot {
    pub const fn new() -> Self {
        EchoSlot { pending: None }
    }

    /// Stage `len` bytes for echo.
    ///
    /// The caller must not stage while a length is already staged; the
    /// engine defers the endpoint read instead, leaving the packet in the
    /// bus buffer.
    pub fn stage(&mut self, len: usize) {
        self.pending = Some(len);
    }

    /// The staged length, if any.
    pub fn staged(&self) -> Option<usize> {
        self.pending
    }

    /// Release the slot after a successful write.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
