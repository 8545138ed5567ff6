pub mod domain;
pub mod ports;

pub use domain::{
    AuthUser, CameraFacing, CodeEmail, Gate, GateStatus, GateType, NewGate, NewPlace, NewVisit,
    Place, ReferenceStub, Role, VideoFrame, VisitQrPayload,
};
pub use ports::{
    AuthService, AuthStateStream, CameraService, DataService, EmailDeliveryService, FrameStream,
    PortError, PortResult,
};
