//! Bus-access gating.
//!
//! A [`BusGate`] answers one question: may a blocking bus transaction be
//! performed right now? The controller consults it before every channel
//! write; a `false` answer routes the write into the pending queue instead
//! of onto the wire. Hosts with time-critical sections (interrupt handlers,
//! bit-banged protocols) supply a gate wired to their interrupt state;
//! everyone else uses [`AlwaysReady`].

/// Capability query consulted before every channel write.
pub trait BusGate {
    /// `true` when a blocking bus transaction may start immediately.
    fn transaction_allowed(&self) -> bool;
}

/// Gate that always permits transactions.
///
/// The right choice for hosts without time-critical sections and for
/// simulated or test targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysReady;

impl BusGate for AlwaysReady {
    fn transaction_allowed(&self) -> bool {
        true
    }
}

/// Any closure reporting the host's concurrency state can act as a gate.
impl<F: Fn() -> bool> BusGate for F {
    fn transaction_allowed(&self) -> bool {
        self()
    }
}

/// Gate backed by the Cortex-M PRIMASK register.
///
/// Transactions are allowed only while interrupts are enabled; writes issued
/// from inside a critical section are queued for [`resolve_queue`] instead.
///
/// [`resolve_queue`]: crate::MotorShield::resolve_queue
#[cfg(feature = "cortex-m")]
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaskGate;

#[cfg(feature = "cortex-m")]
impl BusGate for PrimaskGate {
    fn transaction_allowed(&self) -> bool {
        cortex_m::register::primask::read().is_inactive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_ready_permits() {
        assert!(AlwaysReady.transaction_allowed());
    }

    #[test]
    fn closures_act_as_gates() {
        let closed = || false;
        let open = || true;
        assert!(!closed.transaction_allowed());
        assert!(open.transaction_allowed());
    }
}
