pub mod account_balance;
pub mod api_client;
pub mod auth;
pub mod b2c;
pub mod c2b;
pub mod c2b_validation;
pub mod http_client;
pub mod stk_push;
pub mod transaction_status;

pub use account_balance::{AccountBalanceRequest, AccountBalanceService};
pub use api_client::ApiClient;
pub use auth::{AuthToken, Authenticator, Clock};
pub use b2c::{B2cRequest, B2cService};
pub use c2b::{C2bService, C2bSimulationRequest, RegisterUrlRequest};
pub use c2b_validation::C2bValidator;
pub use http_client::{HttpRequest, HttpResponse, ReqwestTransport, RetryPolicy, Transport};
pub use stk_push::{generate_password, StkPushRequest, StkPushService};
pub use transaction_status::{TransactionStatusRequest, TransactionStatusService};
