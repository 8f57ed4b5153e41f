pub mod category;
pub mod department;
pub mod purchase_request;

pub use category::Category;
pub use department::Department;
pub use purchase_request::{PurchaseRequest, PurchaseRequestDraft, PurchaseRequestStatus};
