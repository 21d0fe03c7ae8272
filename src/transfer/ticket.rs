//! Staleness tickets for asynchronous requests.
//!
//! Each kind of request owns a [`RequestSlot`]. Issuing a ticket supersedes every ticket issued
//! before it, so a response is only applied if its ticket is still the latest one, regardless of
//! the order in which responses arrive.

/// A handle identifying one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

/// Issues monotonically increasing [`Ticket`]s for one kind of request.
#[derive(Debug, Default)]
pub(crate) struct RequestSlot {
    latest: u64,
}

impl RequestSlot {
    /// Issues a new ticket, superseding all previous ones.
    pub(crate) fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    /// Supersedes all issued tickets without issuing a new one.
    pub(crate) fn invalidate(&mut self) {
        self.latest += 1;
    }

    /// Whether `ticket` is the latest issued one.
    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        self.latest == ticket.0
    }
}

/// One slot per kind of request issued by the engine.
#[derive(Debug, Default)]
pub(crate) struct Tickets {
    pub(crate) resolution: RequestSlot,
    pub(crate) estimation: RequestSlot,
    pub(crate) balance: RequestSlot,
    pub(crate) nonce: RequestSlot,
    pub(crate) base_fee: RequestSlot,
}

impl Tickets {
    /// Supersedes every in-flight request.
    pub(crate) fn invalidate_all(&mut self) {
        self.resolution.invalidate();
        self.estimation.invalidate();
        self.balance.invalidate();
        self.nonce.invalidate();
        self.base_fee.invalidate();
    }
}
