use anyhow::Context;
use tracing::{info, instrument};

use crate::auth::password::hash_password;
use crate::users::{
    model::{Address, Company, Geo, NewUser},
    repo::UserDirectory,
};

const SAMPLE_PASSWORD: &str = "password123";

fn text(s: &str) -> Option<String> {
    Some(s.to_string())
}

fn sample_users(password_hash: &str) -> Vec<NewUser> {
    vec![
        NewUser {
            name: text("Leanne Graham"),
            username: "Bret".into(),
            email: "Sincere@april.biz".into(),
            address: Some(Address {
                street: text("Kulas Light"),
                suite: text("Apt. 556"),
                city: text("Gwenborough"),
                zipcode: text("92998-3874"),
                geo: Some(Geo {
                    lat: text("-37.3159"),
                    lng: text("81.1496"),
                }),
            }),
            phone: text("1-770-736-8031 x56442"),
            website: text("hildegard.org"),
            company: Some(Company {
                name: text("Romaguera-Crona"),
                catch_phrase: text("Multi-layered client-server neural-net"),
                bs: text("harness real-time e-markets"),
            }),
            password_hash: password_hash.to_string(),
        },
        NewUser {
            name: text("Ervin Howell"),
            username: "Antonette".into(),
            email: "Shanna@melissa.tv".into(),
            address: Some(Address {
                street: text("Victor Plains"),
                suite: text("Suite 879"),
                city: text("Wisokyburgh"),
                zipcode: text("90566-7771"),
                geo: Some(Geo {
                    lat: text("-43.9509"),
                    lng: text("-34.4618"),
                }),
            }),
            phone: text("010-692-6593 x09125"),
            website: text("anastasia.net"),
            company: Some(Company {
                name: text("Deckow-Crist"),
                catch_phrase: text("Proactive didactic contingency"),
                bs: text("synergize scalable supply-chains"),
            }),
            password_hash: password_hash.to_string(),
        },
    ]
}

/// Inserts the sample accounts into an empty directory. Returns how many were added.
#[instrument(skip(directory))]
pub async fn seed_sample_users(directory: &dyn UserDirectory) -> anyhow::Result<usize> {
    let existing = directory.count().await.context("count users before seeding")?;
    if existing > 0 {
        info!(existing, "directory not empty; skipping sample data");
        return Ok(0);
    }

    let users = sample_users(&hash_password(SAMPLE_PASSWORD)?);
    let total = users.len();
    for user in users {
        let username = user.username.clone();
        directory
            .create(user)
            .await
            .with_context(|| format!("seed user {username}"))?;
    }
    info!(count = total, "sample users seeded");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::users::memory::MemoryDirectory;

    #[tokio::test]
    async fn seeds_an_empty_directory_once() {
        let dir = MemoryDirectory::default();
        assert_eq!(seed_sample_users(&dir).await.unwrap(), 2);
        assert_eq!(seed_sample_users(&dir).await.unwrap(), 0);
        assert_eq!(dir.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn seeded_passwords_are_hashed() {
        let dir = MemoryDirectory::default();
        seed_sample_users(&dir).await.unwrap();

        let bret = dir.find_by_username("Bret").await.unwrap().expect("Bret seeded");
        assert_ne!(bret.password_hash, SAMPLE_PASSWORD);
        assert!(verify_password(SAMPLE_PASSWORD, &bret.password_hash).unwrap());
        assert_eq!(
            bret.company.and_then(|c| c.name).as_deref(),
            Some("Romaguera-Crona")
        );
    }
}
