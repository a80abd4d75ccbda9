use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Byte-level connection the tick drivers talk through, one per player.
///
/// The concrete transport is an external collaborator; the simulation only
/// requires fire-and-forget `send`, a once-per-tick `consume` that drains
/// everything queued by the transport's event handling, and `close`.
pub trait Connection {
    fn send(&mut self, payload: &[u8]);
    fn consume(&mut self) -> Vec<Vec<u8>>;
    fn close(&mut self);
}

type Queue = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// In-process loopback connection for tests and the demo. Both ends live on
/// one thread, matching the single-threaded cooperative model.
#[derive(Debug)]
pub struct MemoryConnection {
    inbound: Queue,
    outbound: Queue,
    open: Rc<RefCell<bool>>,
}

impl MemoryConnection {
    /// Creates both ends of a connection; what one end sends, the other
    /// consumes.
    pub fn pair() -> (MemoryConnection, MemoryConnection) {
        let a_to_b: Queue = Rc::default();
        let b_to_a: Queue = Rc::default();
        let open = Rc::new(RefCell::new(true));
        (
            MemoryConnection {
                inbound: b_to_a.clone(),
                outbound: a_to_b.clone(),
                open: open.clone(),
            },
            MemoryConnection {
                inbound: a_to_b,
                outbound: b_to_a,
                open,
            },
        )
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }
}

impl Connection for MemoryConnection {
    fn send(&mut self, payload: &[u8]) {
        if *self.open.borrow() {
            self.outbound.borrow_mut().push_back(payload.to_vec());
        }
    }

    fn consume(&mut self) -> Vec<Vec<u8>> {
        self.inbound.borrow_mut().drain(..).collect()
    }

    fn close(&mut self) {
        *self.open.borrow_mut() = false;
    }
}
