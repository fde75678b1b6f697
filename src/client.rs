// client.rs
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::errors::Result;
use crate::services::{
    AccountBalanceService, ApiClient, AuthToken, Authenticator, B2cService, C2bService,
    C2bValidator, Clock, ReqwestTransport, StkPushService, TransactionStatusService, Transport,
};

/// Entry point: one value composing the independent operation services.
/// Services share a single API client, so a token obtained by one is reused
/// by the others.
#[derive(Clone)]
pub struct Mpesa {
    api: Arc<ApiClient>,
    stk_push: StkPushService,
    b2c: B2cService,
    c2b: C2bService,
    transaction_status: TransactionStatusService,
    account_balance: AccountBalanceService,
    c2b_validator: C2bValidator,
}

impl Mpesa {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::assemble(config, transport, None))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, transport, None))
    }

    pub fn with_transport_and_clock(
        config: Config,
        transport: Arc<dyn Transport>,
        clock: Clock,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, transport, Some(clock)))
    }

    fn assemble(config: Config, transport: Arc<dyn Transport>, clock: Option<Clock>) -> Self {
        let mut auth = Authenticator::new(&config, transport.clone());
        if let Some(clock) = clock {
            auth = auth.with_clock(clock);
        }
        info!(
            "M-Pesa client ready ({} at {})",
            config.environment(),
            config.base_url()
        );
        let api = Arc::new(ApiClient::with_parts(config, transport, Arc::new(auth)));

        Mpesa {
            stk_push: StkPushService::new(api.clone()),
            b2c: B2cService::new(api.clone()),
            c2b: C2bService::new(api.clone()),
            transaction_status: TransactionStatusService::new(api.clone()),
            account_balance: AccountBalanceService::new(api.clone()),
            c2b_validator: C2bValidator::new(),
            api,
        }
    }

    pub fn config(&self) -> &Config {
        self.api.config()
    }

    pub fn auth(&self) -> &Authenticator {
        self.api.auth()
    }

    pub async fn authenticate(&self) -> Result<AuthToken> {
        self.api.auth().authenticate().await
    }

    pub fn set_auto_authenticate(&self, enabled: bool) {
        self.api.auth().set_auto_authenticate(enabled);
    }

    pub fn stk_push(&self) -> &StkPushService {
        &self.stk_push
    }

    pub fn b2c(&self) -> &B2cService {
        &self.b2c
    }

    pub fn c2b(&self) -> &C2bService {
        &self.c2b
    }

    pub fn transaction_status(&self) -> &TransactionStatusService {
        &self.transaction_status
    }

    pub fn account_balance(&self) -> &AccountBalanceService {
        &self.account_balance
    }

    pub fn c2b_validator(&self) -> &C2bValidator {
        &self.c2b_validator
    }
}
