use ulid::{Generator, Ulid};

use crate::model::*;

use super::ledger::BookingLedger;
use super::store::RoomStore;
use super::validate::validate_request;
use super::AllocationError;

/// Booking id source. Ids are ULIDs from a monotonic generator, so ids minted
/// by one campus are strictly increasing even within the same millisecond.
pub struct BookingIds {
    generator: Generator,
}

impl Default for BookingIds {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingIds {
    pub fn new() -> Self {
        Self {
            generator: Generator::new(),
        }
    }

    pub fn next_id(&mut self) -> Ulid {
        // Overflow needs 2^80 ids in one millisecond; fall back to a fresh ULID.
        self.generator.generate().unwrap_or_else(|_| Ulid::new())
    }
}

/// Outcome of a successful allocation. The caller turns this into a
/// `BookingRecord` and appends it to the ledger.
#[derive(Debug)]
pub struct Allocation<'a> {
    pub room: &'a Room,
    pub booking_id: Ulid,
}

/// Rooms passing every hard filter, in store order:
/// capacity, building, facilities, then availability.
pub fn candidates<'a, 'r>(
    rooms: &'a RoomStore,
    ledger: &'a BookingLedger,
    req: &'r BookingRequest,
) -> impl Iterator<Item = &'a Room> + use<'a, 'r> {
    rooms
        .iter()
        .filter(move |room| room.capacity >= req.capacity)
        .filter(move |room| req.building.as_ref().is_none_or(|b| room.building == *b))
        .filter(move |room| room.facilities.satisfies(&req.facilities))
        .filter(move |room| ledger.is_available(&room.key(), req.date, &req.slot))
}

/// Tightest fit: smallest `|capacity - requested|`, first in store order on ties.
/// The returned room borrows from the store only.
pub fn select_room<'a>(
    rooms: &'a RoomStore,
    ledger: &'a BookingLedger,
    req: &BookingRequest,
) -> Option<&'a Room> {
    candidates(rooms, ledger, req).min_by_key(|room| room.capacity.abs_diff(req.capacity))
}

/// Validate, filter, select. Does not touch the ledger.
pub fn allocate<'a>(
    rooms: &'a RoomStore,
    ledger: &'a BookingLedger,
    ids: &mut BookingIds,
    req: &BookingRequest,
) -> Result<Allocation<'a>, AllocationError> {
    validate_request(req)?;
    let room = select_room(rooms, ledger, req).ok_or(AllocationError::NoCandidate)?;
    Ok(Allocation {
        room,
        booking_id: ids.next_id(),
    })
}
