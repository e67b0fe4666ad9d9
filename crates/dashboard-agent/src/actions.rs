//! Terminal front end
//!
//! Each input line parses into one `UiAction`, and `Dashboard::dispatch` is
//! the single place actions are handled. Mutations are fire-and-forget:
//! their failures come back as notices.

use anyhow::{anyhow, Result};
use dashboard_backend::OrderSide;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use watchlist_sync::{
    DropOutcome, ListView, LiveView, OrderDesk, OrderTicket, ReorderContainer, ReorderController,
    WatchlistSync,
};

/// How an order is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSize {
    /// Value in account currency
    Value(Decimal),
    /// Percent of account equity
    Percent(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// With a symbol, which watchlists hold it
    Lists(Option<String>),
    Show,
    /// `None` selects the default catalog
    Switch(Option<String>),
    Create(String),
    Rename { id: String, name: String },
    Delete(String),
    Add { id: String, symbol: String },
    Remove { id: String, symbol: String },
    Toggle { id: String, symbol: String },
    Search(String),
    Drag { container: ReorderContainer, id: String },
    Over(String),
    /// `None` means released outside any container
    Drop(Option<String>),
    Order { side: OrderSide, symbol: String, size: OrderSize },
    Balance,
    Refresh,
    Help,
    Quit,
}

/// Container argument for `drag`: `lists` or a watchlist id.
fn parse_container(arg: &str) -> ReorderContainer {
    if arg.eq_ignore_ascii_case("lists") {
        ReorderContainer::Watchlists
    } else {
        ReorderContainer::Items {
            watchlist_id: arg.to_string(),
        }
    }
}

fn usage(text: &str) -> Result<UiAction, String> {
    Err(format!("usage: {}", text))
}

fn parse_size(arg: &str) -> Result<OrderSize, String> {
    let (digits, percent) = match arg.strip_suffix('%') {
        Some(digits) => (digits, true),
        None => (arg, false),
    };
    let amount = Decimal::from_str(digits).map_err(|_| format!("invalid amount '{}'", arg))?;
    if amount <= Decimal::ZERO {
        return Err("amount must be greater than zero".to_string());
    }
    Ok(if percent {
        OrderSize::Percent(amount)
    } else {
        OrderSize::Value(amount)
    })
}

impl FromStr for UiAction {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        match (command.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("lists", []) => Ok(UiAction::Lists(None)),
            ("lists", [symbol]) => Ok(UiAction::Lists(Some(symbol.to_string()))),
            ("lists", _) => usage("lists [<symbol>]"),
            ("show", []) => Ok(UiAction::Show),
            ("switch", ["-"]) => Ok(UiAction::Switch(None)),
            ("switch", [id]) => Ok(UiAction::Switch(Some(id.to_string()))),
            ("switch", _) => usage("switch <id|->"),
            // Names may contain spaces; emptiness is checked by the sync layer.
            ("create", _) => Ok(UiAction::Create(rest.to_string())),
            ("rename", [id, ..]) => Ok(UiAction::Rename {
                id: id.to_string(),
                name: rest[id.len()..].trim().to_string(),
            }),
            ("rename", _) => usage("rename <id> <name>"),
            ("delete", [id]) => Ok(UiAction::Delete(id.to_string())),
            ("delete", _) => usage("delete <id>"),
            ("add", [id, symbol]) => Ok(UiAction::Add {
                id: id.to_string(),
                symbol: symbol.to_string(),
            }),
            ("add", _) => usage("add <id> <symbol>"),
            ("remove", [id, symbol]) => Ok(UiAction::Remove {
                id: id.to_string(),
                symbol: symbol.to_string(),
            }),
            ("remove", _) => usage("remove <id> <symbol>"),
            ("toggle", [id, symbol]) => Ok(UiAction::Toggle {
                id: id.to_string(),
                symbol: symbol.to_string(),
            }),
            ("toggle", _) => usage("toggle <id> <symbol>"),
            ("search", [_, ..]) => Ok(UiAction::Search(rest.to_string())),
            ("search", _) => usage("search <query>"),
            ("drag", [container, id]) => Ok(UiAction::Drag {
                container: parse_container(container),
                id: id.to_string(),
            }),
            ("drag", _) => usage("drag <lists|watchlist-id> <id>"),
            ("over", [id]) => Ok(UiAction::Over(id.to_string())),
            ("over", _) => usage("over <id>"),
            ("drop", []) => Ok(UiAction::Drop(None)),
            ("drop", [id]) => Ok(UiAction::Drop(Some(id.to_string()))),
            ("drop", _) => usage("drop [<id>]"),
            ("order", [side, symbol, size]) => Ok(UiAction::Order {
                side: side.parse()?,
                symbol: symbol.to_string(),
                size: parse_size(size)?,
            }),
            ("order", _) => usage("order <buy|sell> <symbol> <value|percent%>"),
            ("balance", []) => Ok(UiAction::Balance),
            ("refresh", []) => Ok(UiAction::Refresh),
            ("help", _) | ("?", _) => Ok(UiAction::Help),
            ("quit", _) | ("exit", _) => Ok(UiAction::Quit),
            ("", _) => Err("empty command".to_string()),
            (other, _) => Err(format!("unknown command '{}' (try 'help')", other)),
        }
    }
}

pub const HELP: &str = "\
commands:
  lists [<sym>]                  show watchlists, or which ones hold a symbol
  show                           show the active view
  switch <id|->                  activate a watchlist, or '-' for all stocks
  create <name>                  create a watchlist
  rename <id> <name>             rename a watchlist
  delete <id>                    delete a watchlist
  add|remove|toggle <id> <sym>   edit watchlist items
  search <query>                 search instruments (2+ characters)
  drag <lists|id> <id>           start reordering watchlists or a watchlist's items
  over <id>                      hover the dragged entry over <id>
  drop [<id>]                    drop on <id>, or outside to cancel
  order <buy|sell> <sym> <value|pct%>
  balance                        refresh account equity
  refresh                        reload watchlists and stocks
  quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Dashboard {
    sync: WatchlistSync,
    live: Arc<LiveView>,
    desk: OrderDesk,
    reorder: ReorderController,
}

impl Dashboard {
    pub fn new(sync: WatchlistSync, live: Arc<LiveView>, desk: OrderDesk) -> Self {
        Self {
            sync,
            live,
            desk,
            reorder: ReorderController::new(),
        }
    }

    pub async fn dispatch(&mut self, action: UiAction) -> Result<Flow> {
        match action {
            UiAction::Lists(symbol) => self.print_lists(symbol.as_deref()),
            UiAction::Show => {
                self.live.reproject();
                print_view(&self.live.current());
            }
            UiAction::Switch(id) => {
                self.sync.switch_to(id.as_deref()).await?;
                self.live.reproject();
                print_view(&self.live.current());
            }
            UiAction::Create(name) => {
                if let Some(created) = self.sync.create(&name).await? {
                    println!("created {} ({})", created.name, created.id);
                }
            }
            UiAction::Rename { id, name } => {
                tokio::spawn(self.sync.rename(&id, &name));
            }
            UiAction::Delete(id) => {
                tokio::spawn(self.sync.delete(&id));
            }
            UiAction::Add { id, symbol } => {
                tokio::spawn(self.sync.add_item(&id, &symbol));
            }
            UiAction::Remove { id, symbol } => {
                tokio::spawn(self.sync.remove_item(&id, &symbol));
            }
            UiAction::Toggle { id, symbol } => {
                tokio::spawn(self.sync.toggle_item(&id, &symbol));
            }
            UiAction::Search(query) => self.print_search(&query),
            UiAction::Drag { container, id } => self.start_drag(container, &id)?,
            UiAction::Over(target) => {
                let container = self
                    .reorder
                    .session()
                    .map(|s| s.container.clone())
                    .ok_or_else(|| anyhow!("nothing is being dragged"))?;
                if let Some(order) = self.reorder.drag_over(&container, &target) {
                    println!("  {}", order.join(" "));
                }
            }
            UiAction::Drop(target) => self.finish_drag(target),
            UiAction::Order { side, symbol, size } => self.place_order(side, &symbol, size).await?,
            UiAction::Balance => {
                let equity = self.desk.refresh_balance().await?;
                println!("balance: {:.2}", equity);
            }
            UiAction::Refresh => {
                self.sync.fetch_all().await?;
                self.sync.load_catalog().await?;
                if let Some(id) = self.sync.store().active().id() {
                    self.sync.load_items(id).await?;
                }
            }
            UiAction::Help => println!("{}", HELP),
            UiAction::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn start_drag(&mut self, container: ReorderContainer, id: &str) -> Result<()> {
        let items = match &container {
            ReorderContainer::Watchlists => self.sync.store().read(|c| c.ids()),
            ReorderContainer::Items { watchlist_id } => self
                .sync
                .store()
                .get(watchlist_id)
                .map(|w| w.items)
                .ok_or_else(|| anyhow!("unknown watchlist {}", watchlist_id))?,
        };
        let id = match container {
            ReorderContainer::Watchlists => id.to_string(),
            ReorderContainer::Items { .. } => watchlist_sync::normalize_symbol(id),
        };
        if !self.reorder.start_drag(container, items, &id) {
            return Err(anyhow!("{} is not in that list", id));
        }
        Ok(())
    }

    fn finish_drag(&mut self, target: Option<String>) {
        let Some(container) = self.reorder.session().map(|s| s.container.clone()) else {
            println!("nothing is being dragged");
            return;
        };
        let target = target.map(|t| match &container {
            ReorderContainer::Watchlists => t,
            ReorderContainer::Items { .. } => watchlist_sync::normalize_symbol(&t),
        });

        match self.reorder.drop(target.as_deref().map(|t| (&container, t))) {
            DropOutcome::Commit(commit) => {
                println!("  {}", commit.ordered_ids.join(" "));
                tokio::spawn(self.sync.apply_reorder(commit));
            }
            DropOutcome::Invalid { restored } => {
                println!("  unchanged: {}", restored.join(" "));
            }
            DropOutcome::Ignored => {}
        }
    }

    async fn place_order(&self, side: OrderSide, symbol: &str, size: OrderSize) -> Result<()> {
        let instrument = self
            .sync
            .universe()
            .read(|u| u.get(symbol).cloned())
            .ok_or_else(|| anyhow!("unknown symbol {}", symbol))?;
        let mut ticket = OrderTicket::new(&instrument, side)?;

        match size {
            OrderSize::Value(value) => ticket.set_value(value),
            OrderSize::Percent(pct) => {
                let equity = match self.desk.balance() {
                    Some(equity) => equity,
                    None => self.desk.refresh_balance().await?,
                };
                ticket.apply_preset(pct, equity);
            }
        }

        println!(
            "{} {} units of {} for {:.2} (sell {:.2} / buy {:.2})",
            side.as_str(),
            ticket.units_display(),
            ticket.symbol,
            ticket.value,
            ticket.sell_quote(),
            ticket.buy_quote()
        );
        self.desk.place(&ticket).await?;
        Ok(())
    }

    fn print_lists(&self, symbol: Option<&str>) {
        let collection = self.sync.store().get_all();
        let active = collection.active().id().map(str::to_string);
        if collection.is_empty() {
            println!("no watchlists yet; try 'create <name>'");
        }
        if let Some(symbol) = symbol {
            for m in collection.membership(symbol) {
                let check = if m.contains { 'x' } else { ' ' };
                println!("  [{}] {:<12} {} ({} items)", check, m.watchlist_id, m.name, m.item_count);
            }
            return;
        }
        for wl in collection.watchlists() {
            let marker = if active.as_deref() == Some(wl.id.as_str()) { '*' } else { ' ' };
            println!("{} {:<12} {} ({} items)", marker, wl.id, wl.name, wl.items.len());
        }
    }

    fn print_search(&self, query: &str) {
        let results = self.sync.universe().search(query);
        if results.is_empty() {
            println!("no matches");
            return;
        }
        let active = self.sync.store().active();
        for inst in results {
            let listed = active
                .id()
                .and_then(|id| self.sync.store().get(id))
                .map(|wl| if wl.contains(&inst.symbol) { " [listed]" } else { "" })
                .unwrap_or("");
            println!("  {:<8} {}{}", inst.symbol, inst.display_name(), listed);
        }
    }
}

pub fn print_view(view: &ListView) {
    println!("== {} ==", view.title());
    if let ListView::Empty { id, name } = view {
        println!("  {} has no instruments yet. Add some with 'add {} <symbol>'.", name, id);
        return;
    }
    for row in view.rows() {
        let sign = if row.is_positive() { "+" } else { "" };
        println!(
            "  {:<8} {:<28} {:>10.2} {}{:.2} ({}{:.2}%)",
            row.symbol,
            row.display_name(),
            row.price,
            sign,
            row.change,
            sign,
            row.change_percent
        );
    }
}
