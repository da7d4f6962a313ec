use crate::model::RoomKey;

/// A booking request rejected before the allocator runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooLong(&'static str),
    ZeroCapacity,
    EndNotAfterStart,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{field} must not be empty"),
            ValidationError::TooLong(field) => write!(f, "{field} too long"),
            ValidationError::ZeroCapacity => write!(f, "capacity must be positive"),
            ValidationError::EndNotAfterStart => write!(f, "end time must be after start time"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Why an allocation produced no booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    Invalid(ValidationError),
    NoCandidate,
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationError::Invalid(e) => write!(f, "invalid request: {e}"),
            AllocationError::NoCandidate => {
                write!(f, "no rooms match requirements or are available")
            }
        }
    }
}

impl std::error::Error for AllocationError {}

impl From<ValidationError> for AllocationError {
    fn from(e: ValidationError) -> Self {
        AllocationError::Invalid(e)
    }
}

#[derive(Debug)]
pub enum EngineError {
    Invalid(ValidationError),
    NoCandidate,
    DuplicateRoom(RoomKey),
    RoomNotFound(RoomKey),
    HasBookings(RoomKey),
    LimitExceeded(&'static str),
    JournalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Invalid(e) => write!(f, "invalid request: {e}"),
            EngineError::NoCandidate => {
                write!(f, "no rooms match requirements or are available")
            }
            EngineError::DuplicateRoom(key) => write!(f, "room already exists: {key}"),
            EngineError::RoomNotFound(key) => write!(f, "room not found: {key}"),
            EngineError::HasBookings(key) => {
                write!(f, "cannot delete room {key}: has bookings")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::JournalError(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::Invalid(e)
    }
}

impl From<AllocationError> for EngineError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::Invalid(v) => EngineError::Invalid(v),
            AllocationError::NoCandidate => EngineError::NoCandidate,
        }
    }
}
