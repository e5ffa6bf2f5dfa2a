pub mod chain;
pub mod configure;
pub mod faucet;
pub mod gateway;
pub mod logger;
pub mod recaptcha;
