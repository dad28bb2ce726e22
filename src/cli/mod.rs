//! Command-line interface handlers

pub mod commands;

pub use commands::{
    cmd_backups, cmd_balance, cmd_buy, cmd_deploy, cmd_events, cmd_finalize, cmd_fund, cmd_info,
    cmd_restore, cmd_send, cmd_set_price, cmd_whitelist, AppState, CliResult,
};
