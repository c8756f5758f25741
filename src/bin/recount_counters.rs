use std::sync::Arc;

use anyhow::{Context, Result};
use perks_api::{
    config::ConfigLoader,
    db,
    models::perk,
    repositories::{BlogCategoryRepository, CategoryRepository, LeadRepository, PerkRepository},
};
use sea_orm::EntityTrait;

#[tokio::main]
async fn main() -> Result<()> {
    let loader = ConfigLoader::new();
    let config = loader.load().context("loading configuration")?;

    let db = Arc::new(
        db::init_pool(&config)
            .await
            .context("initializing database connection pool")?,
    );

    let categories = CategoryRepository::new(db.clone());
    let corrected_categories = categories
        .recount_perks()
        .await
        .context("recounting perks per category")?;

    let blog_categories = BlogCategoryRepository::new(db.clone());
    let corrected_blog_categories = blog_categories
        .recount_posts()
        .await
        .context("recounting posts per blog category")?;

    let leads = LeadRepository::new(db.clone());
    let perks = PerkRepository::new(db.clone());
    let all_perks = perk::Entity::find()
        .all(db.as_ref())
        .await
        .context("querying perks")?;

    let mut corrected_perks = 0usize;
    for perk in all_perks {
        let actual = leads
            .count_for_perk(&perk.id)
            .await
            .with_context(|| format!("counting leads for perk {}", perk.id))? as i32;
        if actual != perk.lead_count {
            perks
                .set_lead_count(&perk.id, actual)
                .await
                .with_context(|| format!("updating lead count for perk {}", perk.id))?;
            corrected_perks += 1;
        }
    }

    println!(
        "Corrected {} category perk counter(s), {} blog category post counter(s), {} perk lead counter(s).",
        corrected_categories, corrected_blog_categories, corrected_perks
    );

    Ok(())
}
