use crate::limits::*;
use crate::model::*;

use super::{EngineError, ValidationError};

pub(crate) fn now_ms() -> Ms {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn validate_request(req: &BookingRequest) -> Result<(), ValidationError> {
    if req.course_name.trim().is_empty() {
        return Err(ValidationError::EmptyField("course_name"));
    }
    if req.course_name.len() > MAX_COURSE_NAME_LEN {
        return Err(ValidationError::TooLong("course_name"));
    }
    if req.instructor.as_ref().is_some_and(|i| i.len() > MAX_NAME_LEN) {
        return Err(ValidationError::TooLong("instructor"));
    }
    if req.building.as_ref().is_some_and(|b| b.len() > MAX_NAME_LEN) {
        return Err(ValidationError::TooLong("building"));
    }
    if req.capacity == 0 {
        return Err(ValidationError::ZeroCapacity);
    }
    if !req.slot.is_valid() {
        return Err(ValidationError::EndNotAfterStart);
    }
    Ok(())
}

pub(crate) fn validate_room(room: &Room) -> Result<(), EngineError> {
    if room.room_id.trim().is_empty() {
        return Err(ValidationError::EmptyField("room_id").into());
    }
    if room.building.trim().is_empty() {
        return Err(ValidationError::EmptyField("building").into());
    }
    if room.room_id.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("room_id too long"));
    }
    if room.building.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("building name too long"));
    }
    if room.capacity == 0 {
        return Err(ValidationError::ZeroCapacity.into());
    }
    Ok(())
}
