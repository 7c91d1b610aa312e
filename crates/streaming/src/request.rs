/// Ticket for one scope fetch; issued in strictly increasing order.
///
/// Small and copyable so it can travel with the async fetch and come back
/// with its response.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);
