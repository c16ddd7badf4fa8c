pub mod activity_log;
pub mod assignment;
pub mod campaign;
pub mod contact;
pub mod message;
pub mod opt_out;
pub mod session;
pub mod transaction;
pub mod volunteer;

pub use activity_log::ActivityLogRepository;
pub use assignment::AssignmentRepository;
pub use campaign::CampaignRepository;
pub use contact::ContactRepository;
pub use message::MessageRepository;
pub use opt_out::OptOutRepository;
pub use session::SessionRepository;
pub use volunteer::VolunteerRepository;
