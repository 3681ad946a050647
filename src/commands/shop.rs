//! `/shop browse` and `/shop buy`: the confirm button carries the chosen item as a payload.

use crate::error::ConfigError;
use crate::interactions::{
    ComponentCodec, ComponentDef, InteractionHandler, Invocation, Reply, handler_fn,
};
use crate::routes::{CommandMeta, OptionKind, OptionSpec, Route};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serenity::builder::{
    CreateActionRow, CreateAutocompleteResponse, CreateButton, CreateInteractionResponse,
};
use serenity::model::application::ButtonStyle;
use std::sync::Arc;

pub const SHOP_CONFIRM: &str = "shop_confirm";
pub const SHOP_CANCEL: &str = "shop_cancel";

pub struct CatalogItem {
    pub sku: &'static str,
    pub name: &'static str,
    pub price: i64,
}

pub const CATALOG: &[CatalogItem] = &[
    CatalogItem {
        sku: "potion",
        name: "Health Potion",
        price: 25,
    },
    CatalogItem {
        sku: "scroll",
        name: "Scroll of Return",
        price: 60,
    },
    CatalogItem {
        sku: "lantern",
        name: "Lantern",
        price: 40,
    },
    CatalogItem {
        sku: "rope",
        name: "Rope (50ft)",
        price: 10,
    },
];

pub fn find_item(sku: &str) -> Option<&'static CatalogItem> {
    CATALOG.iter().find(|i| i.sku.eq_ignore_ascii_case(sku))
}

/// Payload carried by the confirm button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopPick {
    pub sku: String,
    pub price: i64,
}

pub fn routes(codec: &Arc<ComponentCodec>) -> Result<Vec<Route>, ConfigError> {
    Ok(vec![
        Route::parse(
            "shop.browse",
            CommandMeta::builder("List everything for sale.").build(),
            Arc::new(Browse {
                codec: codec.clone(),
            }),
        )?,
        Route::parse(
            "shop.buy",
            CommandMeta::builder("Buy a single item.")
                .option(
                    OptionSpec::new(OptionKind::String, "item", "Item to buy")
                        .required(true)
                        .autocomplete(true),
                )
                .build(),
            Arc::new(Buy {
                codec: codec.clone(),
            }),
        )?,
    ])
}

pub fn components() -> Vec<ComponentDef> {
    vec![
        ComponentDef::button(SHOP_CONFIRM, handler_fn(confirm)),
        ComponentDef::button(SHOP_CANCEL, handler_fn(cancel)),
    ]
}

async fn pick_button(
    codec: &ComponentCodec,
    item: &CatalogItem,
) -> crate::error::BotResult<CreateButton> {
    let pick = ShopPick {
        sku: item.sku.to_string(),
        price: item.price,
    };
    let id = codec.attach(SHOP_CONFIRM, &pick, None).await?;
    Ok(CreateButton::new(id)
        .label(format!("Buy {}", item.name))
        .style(ButtonStyle::Primary))
}

struct Browse {
    codec: Arc<ComponentCodec>,
}

#[async_trait]
impl InteractionHandler for Browse {
    async fn run(&self, inv: Invocation) -> anyhow::Result<()> {
        let mut lines = Vec::new();
        let mut buttons = Vec::new();
        for item in CATALOG {
            lines.push(format!("• **{}** (`{}`) - {} coins", item.name, item.sku, item.price));
            buttons.push(pick_button(&self.codec, item).await?);
        }
        let rows = buttons
            .chunks(5)
            .map(|chunk| CreateActionRow::Buttons(chunk.to_vec()))
            .collect();
        inv.responder
            .reply(Reply::ephemeral(lines.join("\n")).components(rows))
            .await?;
        Ok(())
    }
}

struct Buy {
    codec: Arc<ComponentCodec>,
}

#[async_trait]
impl InteractionHandler for Buy {
    async fn run(&self, inv: Invocation) -> anyhow::Result<()> {
        let sku = inv.option_str("item").unwrap_or_default();
        let Some(item) = find_item(sku) else {
            inv.reply_ephemeral(format!("No item called `{sku}` is for sale."))
                .await?;
            return Ok(());
        };
        let row = CreateActionRow::Buttons(vec![
            pick_button(&self.codec, item).await?,
            CreateButton::new(SHOP_CANCEL)
                .label("Cancel")
                .style(ButtonStyle::Secondary),
        ]);
        inv.responder
            .reply(
                Reply::ephemeral(format!("Buy **{}** for {} coins?", item.name, item.price))
                    .components(vec![row]),
            )
            .await?;
        Ok(())
    }

    async fn autocomplete(&self, inv: Invocation) -> anyhow::Result<()> {
        let (Some(ctx), Some(cmd)) = (inv.context(), inv.command()) else {
            return Ok(());
        };
        let typed = inv.option_str("item").unwrap_or_default().to_ascii_lowercase();
        let mut response = CreateAutocompleteResponse::new();
        for item in CATALOG.iter().filter(|i| i.sku.starts_with(&typed)) {
            response = response.add_string_choice(item.name, item.sku);
        }
        cmd.create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response))
            .await?;
        Ok(())
    }
}

async fn confirm(inv: Invocation) -> anyhow::Result<()> {
    let pick: ShopPick = inv.payload_as()?;
    let name = find_item(&pick.sku).map(|i| i.name).unwrap_or("item");
    inv.responder
        .update(Reply::new(format!("Purchased **{name}** for {} coins.", pick.price)))
        .await?;
    Ok(())
}

async fn cancel(inv: Invocation) -> anyhow::Result<()> {
    inv.responder.update(Reply::new("Purchase cancelled.")).await?;
    Ok(())
}
