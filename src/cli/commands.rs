//! CLI commands for the crowdsale
//!
//! Implements all command handlers for the CLI interface. Every state
//! change is submitted as a transaction and saved on success.

use crate::core::{
    format_units, parse_units, Call, Chain, Event, Receipt, Transaction, NATIVE_DECIMALS,
};
use crate::deploy::{deploy_sale, DeployConfig};
use crate::sale::{Crowdsale, TOKEN_DECIMALS};
use crate::storage::{Storage, StorageConfig};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub chain: Chain,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize application state
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage_config = StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };

        let storage = Storage::new(storage_config)?;

        if !storage.exists() {
            println!("🆕 Creating new chain in {:?}", data_dir);
        }
        let chain = storage.load_or_default()?;

        Ok(Self {
            chain,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.chain)?;
        Ok(())
    }

    /// Submit a transaction and persist the result
    fn submit(&mut self, tx: Transaction) -> CliResult<Receipt> {
        let receipt = self.chain.submit(tx)?;
        self.save()?;
        Ok(receipt)
    }

    fn sale(&self, address: &str) -> CliResult<&Crowdsale> {
        self.chain
            .sale(address)
            .ok_or_else(|| format!("Sale not found: {}", address).into())
    }
}

fn coins(amount: u128) -> String {
    format!("{} coins", format_units(amount, NATIVE_DECIMALS))
}

fn tokens(amount: u128) -> String {
    format_units(amount, TOKEN_DECIMALS as u32)
}

fn describe(event: &Event) -> String {
    match event {
        Event::Transfer(e) => format!("{} → {}: {} tokens", e.from, e.to, tokens(e.amount)),
        Event::Approval(e) => format!(
            "{} allows {} to spend {} tokens",
            e.owner,
            e.spender,
            tokens(e.amount)
        ),
        Event::NativeTransfer(e) => format!("{} → {}: {}", e.from, e.to, coins(e.amount)),
        Event::Buy(e) => format!("{} bought {} tokens", e.buyer, tokens(e.quantity)),
        Event::Finalize(e) => format!(
            "sold {} tokens, collected {}",
            tokens(e.tokens_sold),
            coins(e.payment_collected)
        ),
    }
}

fn print_receipt(receipt: &Receipt) {
    println!(
        "   ├─ Tx: {} (height {})",
        &receipt.tx_id[..16],
        receipt.height
    );
    if receipt.events.is_empty() {
        println!("   └─ No events");
    }
    for (i, event) in receipt.events.iter().enumerate() {
        let branch = if i + 1 == receipt.events.len() {
            "└─"
        } else {
            "├─"
        };
        println!("   {} {}: {}", branch, event.name(), describe(event));
    }
}

/// Deploy a token and a crowdsale, and move the supply into the sale
pub fn cmd_deploy(
    state: &mut AppState,
    operator: &str,
    config_path: Option<&Path>,
    now: DateTime<Utc>,
) -> CliResult<()> {
    let config = match config_path {
        Some(path) => DeployConfig::load(path)?,
        None => DeployConfig::default(),
    };

    // Steps committed before a failure stay on the chain
    let result = deploy_sale(&mut state.chain, operator, &config, now);
    state.save()?;
    let deployment = result?;

    println!("🚀 Crowdsale deployed!");
    println!(
        "   ├─ Token: {} ({}) at {}",
        config.token_name, config.token_symbol, deployment.token
    );
    println!("   ├─ Sale: {}", deployment.sale);
    println!("   ├─ Supply: {} tokens", config.max_supply);
    println!("   ├─ Price: {} coins per token", config.price);
    println!(
        "   └─ Opens: {}",
        deployment.sale_open_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(())
}

/// Credit native coins to an account
pub fn cmd_fund(state: &mut AppState, account: &str, amount: &str) -> CliResult<()> {
    let amount = parse_units(amount, NATIVE_DECIMALS)?;

    state.chain.allocate(account, amount)?;
    state.save()?;

    println!("💧 Funded {} with {}", account, coins(amount));
    println!("   New balance: {}", coins(state.chain.native_balance(account)));

    Ok(())
}

/// Add an account to a sale's whitelist
pub fn cmd_whitelist(
    state: &mut AppState,
    operator: &str,
    sale: &str,
    account: &str,
    now: DateTime<Utc>,
) -> CliResult<()> {
    let already = state.sale(sale)?.is_whitelisted(account);

    let call = Call::AddToWhitelist {
        sale: sale.to_string(),
        account: account.to_string(),
    };
    state.submit(Transaction::new(operator, call, now))?;

    if already {
        println!("ℹ️  {} was already whitelisted", account);
    } else {
        println!("✅ {} added to the whitelist of {}", account, sale);
    }

    Ok(())
}

/// Change a sale's price
pub fn cmd_set_price(
    state: &mut AppState,
    operator: &str,
    sale: &str,
    price: &str,
    now: DateTime<Utc>,
) -> CliResult<()> {
    let new_price = parse_units(price, TOKEN_DECIMALS as u32)?;
    let old_price = state.sale(sale)?.price();

    let call = Call::SetPrice {
        sale: sale.to_string(),
        price: new_price,
    };
    state.submit(Transaction::new(operator, call, now))?;

    println!("🏷️  Price updated for {}", sale);
    println!("   ├─ Old: {} per token", coins(old_price));
    println!("   └─ New: {} per token", coins(new_price));

    Ok(())
}

/// Buy tokens from a sale
///
/// Pays the exact cost unless `pay` overrides the attached amount.
pub fn cmd_buy(
    state: &mut AppState,
    buyer: &str,
    sale: &str,
    quantity: &str,
    pay: Option<&str>,
    now: DateTime<Utc>,
) -> CliResult<()> {
    let quantity = parse_units(quantity, TOKEN_DECIMALS as u32)?;
    let value = match pay {
        Some(amount) => parse_units(amount, NATIVE_DECIMALS)?,
        None => state
            .sale(sale)?
            .cost_of(quantity)
            .ok_or("Cost of purchase overflows")?,
    };

    let call = Call::Buy {
        sale: sale.to_string(),
        quantity,
    };
    let receipt = state.submit(Transaction::new(buyer, call, now).with_value(value))?;

    println!("🛒 Bought {} tokens for {}", tokens(quantity), coins(value));
    print_receipt(&receipt);

    Ok(())
}

/// Send native coins; sending to a sale buys tokens at the current price
pub fn cmd_send(
    state: &mut AppState,
    from: &str,
    to: &str,
    amount: &str,
    now: DateTime<Utc>,
) -> CliResult<()> {
    let value = parse_units(amount, NATIVE_DECIMALS)?;

    let call = Call::Send { to: to.to_string() };
    let receipt = state.submit(Transaction::new(from, call, now).with_value(value))?;

    println!("📤 Sent {} from {} to {}", coins(value), from, to);
    print_receipt(&receipt);

    Ok(())
}

/// Close a sale and sweep its balances to the operator
pub fn cmd_finalize(
    state: &mut AppState,
    operator: &str,
    sale: &str,
    now: DateTime<Utc>,
) -> CliResult<()> {
    let call = Call::Finalize {
        sale: sale.to_string(),
    };
    let receipt = state.submit(Transaction::new(operator, call, now))?;

    println!("🏁 Sale {} finalized", sale);
    print_receipt(&receipt);

    Ok(())
}

/// Display chain info, or the details of one sale
pub fn cmd_info(state: &AppState, sale: Option<&str>, now: DateTime<Utc>) -> CliResult<()> {
    let Some(address) = sale else {
        let stats = state.chain.stats();

        println!("⛓️  Chain Info");
        println!("   ├─ Height: {}", stats.height);
        println!("   ├─ Tokens: {}", stats.token_count);
        println!("   ├─ Sales: {}", stats.sale_count);
        println!("   ├─ Events: {}", stats.event_count);
        println!("   ├─ Coins issued: {}", coins(stats.native_issued));

        let storage = state.storage.stats()?;
        println!(
            "   └─ Storage: {} bytes in {:?}, {} backup(s)",
            storage.file_size, storage.data_dir, storage.backup_count
        );

        for address in state.chain.sales().list() {
            println!("   🏪 {}", address);
        }
        return Ok(());
    };

    let sale = state.sale(address)?;
    let status = if sale.is_finalized() {
        "finalized"
    } else if sale.is_open(now) {
        "open"
    } else {
        "not yet open"
    };
    let symbol = state
        .chain
        .token(sale.token())
        .map(|t| t.symbol().to_string())
        .unwrap_or_default();
    let inventory = state.chain.token_balance(sale.token(), sale.address())?;

    println!("🏪 Crowdsale {}", sale.address());
    println!("   ├─ Status: {}", status);
    println!("   ├─ Token: {} ({})", sale.token(), symbol);
    println!("   ├─ Operator: {}", sale.operator());
    println!("   ├─ Deployed at height: {}", sale.deployed_at_height());
    println!("   ├─ Price: {} per token", coins(sale.price()));
    println!("   ├─ Opens: {}", sale.sale_open_at().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("   ├─ Max tokens: {}", tokens(sale.max_tokens()));
    println!("   ├─ Tokens sold: {}", tokens(sale.tokens_sold()));
    println!("   ├─ Inventory: {}", tokens(inventory));
    println!(
        "   ├─ Proceeds: {}",
        coins(state.chain.native_balance(sale.address()))
    );
    println!("   └─ Whitelist: {} account(s)", sale.whitelist().count());
    for account in sale.whitelist() {
        println!("      • {}", account);
    }

    Ok(())
}

/// Show native and token balances of an account
pub fn cmd_balance(state: &AppState, account: &str) -> CliResult<()> {
    println!("💰 Balance for {}", account);
    println!("   Coins: {}", coins(state.chain.native_balance(account)));

    let holdings = state.chain.tokens().tokens_for_holder(account);
    if holdings.is_empty() {
        println!("   No tokens");
    }
    for (token, amount) in holdings {
        println!(
            "   └─ {} {} ({})",
            format_units(amount, token.decimals() as u32),
            token.symbol(),
            token.address
        );
    }

    Ok(())
}

/// List the most recent events, optionally filtered by name
pub fn cmd_events(state: &AppState, count: usize, name: Option<&str>) -> CliResult<()> {
    let events: Vec<_> = state
        .chain
        .events()
        .iter()
        .filter(|logged| name.map_or(true, |n| logged.event.name().eq_ignore_ascii_case(n)))
        .collect();

    if events.is_empty() {
        println!("📭 No events");
        return Ok(());
    }

    println!("📜 Events ({} of {}):", count.min(events.len()), events.len());
    let start = events.len().saturating_sub(count);
    for logged in &events[start..] {
        println!(
            "   #{} | {} | {} | {}",
            logged.height,
            logged.timestamp.format("%Y-%m-%d %H:%M:%S"),
            logged.event.name(),
            describe(&logged.event)
        );
    }

    Ok(())
}

/// List saved backups, newest first
pub fn cmd_backups(state: &AppState) -> CliResult<()> {
    let backups = state.storage.list_backups();

    if backups.is_empty() {
        println!("📭 No backups in {:?}", state.data_dir);
        return Ok(());
    }

    println!("🗄️  Backups:");
    for index in backups {
        let chain = state.storage.restore_backup(index)?;
        println!(
            "   #{} | height {} | {} event(s)",
            index,
            chain.height(),
            chain.events().len()
        );
    }

    Ok(())
}

/// Replace the current chain with a saved backup
///
/// The replaced chain becomes the newest backup.
pub fn cmd_restore(state: &mut AppState, backup: usize) -> CliResult<()> {
    let chain = state.storage.restore_backup(backup)?;
    let previous = state.chain.height();

    state.chain = chain;
    state.save()?;

    println!("⏪ Restored backup #{}", backup);
    println!("   ├─ Previous height: {}", previous);
    println!("   └─ Height: {}", state.chain.height());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::SCALE;
    use chrono::Duration;

    fn state() -> (tempfile::TempDir, AppState) {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, state)
    }

    #[test]
    fn test_deploy_buy_finalize_persists() {
        let (temp_dir, mut state) = state();
        let now = Utc::now();
        let open = now + Duration::seconds(60);

        cmd_deploy(&mut state, "deployer", None, now).unwrap();
        let sale = state.chain.sales().list().remove(0);

        cmd_fund(&mut state, "alice", "100").unwrap();
        cmd_whitelist(&mut state, "deployer", &sale, "alice", now).unwrap();
        cmd_buy(&mut state, "alice", &sale, "10", None, open).unwrap();
        cmd_finalize(&mut state, "deployer", &sale, open).unwrap();

        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.chain.height(), state.chain.height());
        assert_eq!(reloaded.chain.native_balance("deployer"), SCALE / 4);
        assert_eq!(reloaded.chain.native_balance("alice"), 100 * SCALE - SCALE / 4);
        assert!(reloaded.chain.sale(&sale).unwrap().is_finalized());
    }

    #[test]
    fn test_rejected_buy_is_not_saved() {
        let (temp_dir, mut state) = state();
        let now = Utc::now();

        cmd_deploy(&mut state, "deployer", None, now).unwrap();
        let sale = state.chain.sales().list().remove(0);
        cmd_fund(&mut state, "alice", "100").unwrap();
        cmd_whitelist(&mut state, "deployer", &sale, "alice", now).unwrap();

        // Before the sale opens
        assert!(cmd_buy(&mut state, "alice", &sale, "10", None, now).is_err());
        // Wrong payment
        let open = now + Duration::seconds(60);
        assert!(cmd_buy(&mut state, "alice", &sale, "10", Some("1"), open).is_err());

        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.chain.native_balance("alice"), 100 * SCALE);
        assert_eq!(reloaded.chain.sale(&sale).unwrap().tokens_sold(), 0);
    }

    #[test]
    fn test_failed_deploy_keeps_committed_steps() {
        let (temp_dir, mut state) = state();
        let config_path = temp_dir.path().join("deploy.json");
        std::fs::write(&config_path, r#"{"price": "0"}"#).unwrap();

        // The token deploys, the zero-price sale is rejected
        assert!(cmd_deploy(&mut state, "deployer", Some(&config_path), Utc::now()).is_err());

        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.chain.height(), 1);
        assert_eq!(reloaded.chain.tokens().count(), 1);
        assert_eq!(reloaded.chain.sales().count(), 0);
    }

    #[test]
    fn test_info_shows_sale_and_storage() {
        let (_temp_dir, mut state) = state();
        let now = Utc::now();

        cmd_deploy(&mut state, "deployer", None, now).unwrap();
        let sale = state.chain.sales().list().remove(0);

        assert_eq!(state.chain.sale(&sale).unwrap().deployed_at_height(), 2);
        cmd_info(&state, Some(&sale), now).unwrap();
        cmd_info(&state, None, now).unwrap();
    }

    #[test]
    fn test_restore_backup() {
        let (temp_dir, mut state) = state();
        let now = Utc::now();

        cmd_deploy(&mut state, "deployer", None, now).unwrap();
        cmd_fund(&mut state, "alice", "100").unwrap();
        assert_eq!(state.chain.native_balance("alice"), 100 * SCALE);
        cmd_backups(&state).unwrap();

        // Backup 0 is the chain before funding
        cmd_restore(&mut state, 0).unwrap();
        assert_eq!(state.chain.native_balance("alice"), 0);
        assert_eq!(state.chain.height(), 3);

        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.chain.native_balance("alice"), 0);

        assert!(cmd_restore(&mut state, 4).is_err());
    }

    #[test]
    fn test_unknown_sale() {
        let (_temp_dir, mut state) = state();

        assert!(cmd_set_price(&mut state, "deployer", "0xNOPE", "1", Utc::now()).is_err());
        assert!(cmd_info(&state, Some("0xNOPE"), Utc::now()).is_err());
    }
}
