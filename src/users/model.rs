use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geo {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

/// Postal address stored inline with its user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub suite: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub geo: Option<Geo>,
}

/// Employer stored inline with its user. `bs` is the company tagline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: Option<String>,
    pub catch_phrase: Option<String>,
    pub bs: Option<String>,
}

/// User record as held by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    pub address: Option<Address>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub company: Option<Company>,
    #[serde(skip_serializing, default)]
    pub password_hash: String, // argon2 PHC string, never sent to clients
}

/// Everything needed to create a user; the id is assigned by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    pub address: Option<Address>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub company: Option<Company>,
    pub password_hash: String,
}

/// Address with every field unset, including geo, collapses to `None`,
/// the same way an all-NULL set of columns reads back.
pub(crate) fn non_empty_address(address: Option<Address>) -> Option<Address> {
    let mut address = address?;
    address.geo = address
        .geo
        .filter(|g| g.lat.is_some() || g.lng.is_some());
    let empty = address.street.is_none()
        && address.suite.is_none()
        && address.city.is_none()
        && address.zipcode.is_none()
        && address.geo.is_none();
    (!empty).then_some(address)
}

pub(crate) fn non_empty_company(company: Option<Company>) -> Option<Company> {
    company.filter(|c| c.name.is_some() || c.catch_phrase.is_some() || c.bs.is_some())
}

impl NewUser {
    pub(crate) fn into_user(self, id: Uuid) -> User {
        User {
            id,
            name: self.name,
            username: self.username,
            email: self.email,
            address: non_empty_address(self.address),
            phone: self.phone,
            website: self.website,
            company: non_empty_company(self.company),
            password_hash: self.password_hash,
        }
    }
}

/// Body of `PUT /users/:id`.
///
/// Username and password are not part of it, so fields such as `username` or
/// `id` in an echoed user document are ignored. Optional fields replace the
/// stored value (absent clears it); `email` is only replaced when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<Address>,
    pub company: Option<Company>,
}

impl User {
    pub(crate) fn apply(&mut self, update: UserUpdate) {
        self.name = update.name;
        if let Some(email) = update.email {
            self.email = email;
        }
        self.phone = update.phone;
        self.website = update.website;
        self.address = non_empty_address(update.address);
        self.company = non_empty_company(update.company);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: Uuid::new_v4(),
            name: Some("Leanne Graham".into()),
            username: "Bret".into(),
            email: "Sincere@april.biz".into(),
            address: Some(Address {
                street: Some("Kulas Light".into()),
                suite: Some("Apt. 556".into()),
                city: Some("Gwenborough".into()),
                zipcode: Some("92998-3874".into()),
                geo: Some(Geo {
                    lat: Some("-37.3159".into()),
                    lng: Some("81.1496".into()),
                }),
            }),
            phone: Some("1-770-736-8031 x56442".into()),
            website: Some("hildegard.org".into()),
            company: Some(Company {
                name: Some("Romaguera-Crona".into()),
                catch_phrase: Some("Multi-layered client-server neural-net".into()),
                bs: Some("harness real-time e-markets".into()),
            }),
            password_hash: "$argon2id$v=19$secret".into(),
        }
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn nested_objects_use_client_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["address"]["geo"]["lat"], "-37.3159");
        assert_eq!(
            json["company"]["catchPhrase"],
            "Multi-layered client-server neural-net"
        );
        assert_eq!(json["username"], "Bret");
    }

    #[test]
    fn update_accepts_an_echoed_user_document() {
        let mut doc = serde_json::to_value(sample()).unwrap();
        doc["name"] = "Updated Name".into();
        let update: UserUpdate = serde_json::from_value(doc).unwrap();
        assert_eq!(update.name.as_deref(), Some("Updated Name"));
        assert_eq!(update.email.as_deref(), Some("Sincere@april.biz"));
    }

    #[test]
    fn blank_value_objects_collapse() {
        assert_eq!(non_empty_address(Some(Address::default())), None);
        assert_eq!(
            non_empty_address(Some(Address {
                geo: Some(Geo::default()),
                ..Address::default()
            })),
            None
        );
        let kept = non_empty_address(Some(Address {
            zipcode: Some("12345".into()),
            geo: Some(Geo::default()),
            ..Address::default()
        }))
        .unwrap();
        assert!(kept.geo.is_none());
        assert_eq!(non_empty_company(Some(Company::default())), None);
    }

    #[test]
    fn apply_keeps_identity_and_email_when_absent() {
        let mut user = sample();
        let before = user.clone();
        user.apply(UserUpdate {
            name: Some("New".into()),
            ..UserUpdate::default()
        });
        assert_eq!(user.id, before.id);
        assert_eq!(user.username, before.username);
        assert_eq!(user.email, before.email);
        assert_eq!(user.password_hash, before.password_hash);
        assert_eq!(user.name.as_deref(), Some("New"));
        assert!(user.address.is_none());
        assert!(user.company.is_none());
    }
}
