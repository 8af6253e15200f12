use serde::{Deserialize, Serialize};

/// A user record as served by the remote source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: u64,
  pub name: String,
  pub username: String,
  pub email: String,
  pub address: Address,
  pub phone: String,
  pub website: String,
  pub company: Company,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
  pub street: String,
  pub suite: String,
  pub city: String,
  pub zipcode: String,
  pub geo: Geo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geo {
  pub lat: String,
  pub lng: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
  pub name: String,
  pub catch_phrase: String,
  pub bs: String,
}

/// A user created locally, before an id is assigned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewUser {
  pub name: String,
  pub username: String,
  pub email: String,
  pub address: Address,
  pub phone: String,
  pub website: String,
  pub company: Company,
}

impl NewUser {
  pub fn with_id(self, id: u64) -> User {
    User {
      id,
      name: self.name,
      username: self.username,
      email: self.email,
      address: self.address,
      phone: self.phone,
      website: self.website,
      company: self.company,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"{
    "id": 1,
    "name": "Leanne Graham",
    "username": "Bret",
    "email": "Sincere@april.biz",
    "address": {
      "street": "Kulas Light",
      "suite": "Apt. 556",
      "city": "Gwenborough",
      "zipcode": "92998-3874",
      "geo": { "lat": "-37.3159", "lng": "81.1496" }
    },
    "phone": "1-770-736-8031 x56442",
    "website": "hildegard.org",
    "company": {
      "name": "Romaguera-Crona",
      "catchPhrase": "Multi-layered client-server neural-net",
      "bs": "harness real-time e-markets"
    }
  }"#;

  #[test]
  fn test_deserialize_remote_user() {
    let user: User = serde_json::from_str(SAMPLE).unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.username, "Bret");
    assert_eq!(user.address.geo.lat, "-37.3159");
    assert_eq!(user.company.catch_phrase, "Multi-layered client-server neural-net");
  }

  #[test]
  fn test_serialize_uses_camel_case_company() {
    let user: User = serde_json::from_str(SAMPLE).unwrap();
    let json = serde_json::to_value(&user).unwrap();
    assert!(json["company"].get("catchPhrase").is_some());
    assert!(json["company"].get("catch_phrase").is_none());
  }

  #[test]
  fn test_new_user_with_id() {
    let new_user = NewUser {
      name: "Ann".to_string(),
      email: "a@b.com".to_string(),
      ..Default::default()
    };
    let user = new_user.with_id(11);
    assert_eq!(user.id, 11);
    assert_eq!(user.name, "Ann");
  }
}
