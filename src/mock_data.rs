use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use redis::aio::ConnectionManager;
use redis::RedisResult;
use std::time::Instant;

const NUM_USERS: usize = 1_000;
const NUM_PRODUCTS: usize = 200;
/// Pipeline batch size.
const BATCH: usize = 250;

static FIRST: &[&str] = &["Ada", "Grace", "Alan", "Linus", "Barbara", "Ken", "Radia", "Dennis"];
static LAST: &[&str] = &["Lovelace", "Hopper", "Turing", "Torvalds", "Liskov", "Thompson", "Perlman"];
static ROLES: &[&str] = &["admin", "editor", "viewer"];
static ADJ: &[&str] = &["Compact", "Wireless", "Ergonomic", "Portable", "Modern", "Dual"];
static NOUN: &[&str] = &["Keyboard", "Monitor", "Headset", "Dock", "Webcam", "Router"];
static CAT: &[&str] = &["peripherals", "audio", "networking", "office"];

/// Fill Redis with deterministic users and products for the demo routes.
pub async fn seed(conn: &ConnectionManager) -> RedisResult<()> {
    let start = Instant::now();
    tracing::info!(users = NUM_USERS, products = NUM_PRODUCTS, "seeding redis");

    let mut conn = conn.clone();
    let mut rng = StdRng::seed_from_u64(42);

    seed_users(&mut conn, &mut rng).await?;
    seed_products(&mut conn, &mut rng).await?;

    tracing::info!(elapsed_secs = start.elapsed().as_secs_f64(), "seed complete");
    Ok(())
}

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

async fn seed_users(conn: &mut ConnectionManager, rng: &mut StdRng) -> RedisResult<()> {
    for batch_start in (0..NUM_USERS).step_by(BATCH) {
        let batch_end = (batch_start + BATCH).min(NUM_USERS);
        let mut pipe = redis::pipe();

        for i in batch_start..batch_end {
            let id = format!("usr_{:08}", i + 1);
            let first = pick(rng, FIRST);
            let last = pick(rng, LAST);
            let email = format!("{}.{}{}@example.com", first.to_lowercase(), last.to_lowercase(), i + 1);
            let theme = if rng.gen_bool(0.5) { "dark" } else { "light" };
            let prefs = format!(r#"{{"theme":"{theme}","lang":"en"}}"#);

            pipe.cmd("HSET")
                .arg(format!("user:{id}"))
                .arg("id")
                .arg(&id)
                .arg("name")
                .arg(format!("{first} {last}"))
                .arg("email")
                .arg(email)
                .arg("role")
                .arg(pick(rng, ROLES))
                .arg("prefs")
                .arg(prefs)
                .arg("created_at")
                .arg("2025-01-15T09:23:11Z")
                .ignore();
        }

        let _: () = pipe.query_async(conn).await?;
    }
    Ok(())
}

async fn seed_products(conn: &mut ConnectionManager, rng: &mut StdRng) -> RedisResult<()> {
    let mut pipe = redis::pipe();

    for i in 0..NUM_PRODUCTS {
        let id = format!("prod_{:04}", i + 1);
        let title = format!("{} {}", pick(rng, ADJ), pick(rng, NOUN));
        let category = pick(rng, CAT);

        pipe.cmd("HSET")
            .arg(format!("product:{id}"))
            .arg("id")
            .arg(&id)
            .arg("title")
            .arg(&title)
            .arg("price")
            .arg(rng.gen_range(999..=49_999u64))
            .arg("stock")
            .arg(rng.gen_range(0..=500u32))
            .arg("category")
            .arg(category)
            .arg("description")
            .arg(format!("{title} for {category} setups."))
            .ignore();
    }

    let _: () = pipe.query_async(conn).await?;
    Ok(())
}
