pub mod account_balance;
pub mod c2b;
pub mod callbacks;
pub mod response;
pub mod result_parameters;
pub mod transaction_status;

pub use account_balance::{parse_balance_result, AccountBalanceEntry, AccountBalanceResponse};
pub use c2b::{C2bReceiverReply, C2bValidationResponse};
pub use callbacks::{B2cAccountBalances, B2cErrorCategory, B2cResult, CallbackItem, StkCallback};
pub use response::{
    ApiResponse, B2cResponse, C2bSimulationResponse, RegisterUrlResponse, StkPushResponse,
    StkQueryResponse,
};
pub use result_parameters::ResultParameter;
pub use transaction_status::TransactionStatusResponse;
