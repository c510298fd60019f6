pub mod certificate;
pub mod conference;
pub mod paper;
pub mod registration;
pub mod review;
pub mod role;
pub mod session;
pub mod track;
pub mod user;

pub use certificate::{Certificate, CertificateType};
pub use conference::{Conference, ConferenceStatus};
pub use paper::{Paper, PaperStatus};
pub use registration::{PaymentStatus, Registration};
pub use review::{Recommendation, Review};
pub use role::{ConferenceRole, RoleKind, RoleStatus};
pub use session::{Session, SessionPaper};
pub use track::Track;
pub use user::User;
