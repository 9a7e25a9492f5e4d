pub mod payment_verification;

pub use payment_verification::{
    PaymentConfirmation, PaymentVerificationPoller, VerificationState,
};
