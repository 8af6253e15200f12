//! Validation for the create-user form.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

use super::types::{Address, Company, Geo, NewUser};

static EMAIL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Fields of the create-user form, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
  Name,
  Username,
  Email,
  Phone,
  Website,
  Street,
  Suite,
  City,
  Zipcode,
  Lat,
  Lng,
  CompanyName,
  CatchPhrase,
  Bs,
}

impl FormField {
  pub const ALL: [FormField; 14] = [
    FormField::Name,
    FormField::Username,
    FormField::Email,
    FormField::Phone,
    FormField::Website,
    FormField::Street,
    FormField::Suite,
    FormField::City,
    FormField::Zipcode,
    FormField::Lat,
    FormField::Lng,
    FormField::CompanyName,
    FormField::CatchPhrase,
    FormField::Bs,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      FormField::Name => "Full Name",
      FormField::Username => "Username",
      FormField::Email => "Email",
      FormField::Phone => "Phone",
      FormField::Website => "Website",
      FormField::Street => "Street",
      FormField::Suite => "Suite",
      FormField::City => "City",
      FormField::Zipcode => "Zipcode",
      FormField::Lat => "Latitude",
      FormField::Lng => "Longitude",
      FormField::CompanyName => "Company Name",
      FormField::CatchPhrase => "Catch Phrase",
      FormField::Bs => "Business",
    }
  }

  pub fn is_required(&self) -> bool {
    self.required_message().is_some()
  }

  fn required_message(&self) -> Option<&'static str> {
    match self {
      FormField::Name => Some("Name is required"),
      FormField::Username => Some("Username is required"),
      FormField::Email => Some("Email is required"),
      FormField::Phone => Some("Phone is required"),
      FormField::Street => Some("Street is required"),
      FormField::City => Some("City is required"),
      FormField::Zipcode => Some("Zipcode is required"),
      FormField::CompanyName => Some("Company name is required"),
      _ => None,
    }
  }
}

/// Field-level validation failures. Empty means the form can be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} field(s) need attention", .0.len())]
pub struct ValidationErrors(BTreeMap<FormField, String>);

impl ValidationErrors {
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, field: FormField) -> Option<&str> {
    self.0.get(&field).map(String::as_str)
  }

  pub fn fields(&self) -> impl Iterator<Item = (FormField, &str)> {
    self.0.iter().map(|(field, message)| (*field, message.as_str()))
  }

  /// Drop the error for a field, e.g. once the user edits it again.
  pub fn clear(&mut self, field: FormField) {
    self.0.remove(&field);
  }
}

/// Raw text values of the create-user form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
  values: BTreeMap<FormField, String>,
}

impl UserForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn value(&self, field: FormField) -> &str {
    self.values.get(&field).map(String::as_str).unwrap_or("")
  }

  pub fn set(&mut self, field: FormField, value: impl Into<String>) {
    self.values.insert(field, value.into());
  }

  pub fn with(mut self, field: FormField, value: impl Into<String>) -> Self {
    self.set(field, value);
    self
  }

  /// Validate and build the user record.
  pub fn into_new_user(self) -> Result<NewUser, ValidationErrors> {
    let errors = validate(&self);
    if !errors.is_empty() {
      return Err(errors);
    }

    let v = |field| self.value(field).to_string();
    Ok(NewUser {
      name: v(FormField::Name),
      username: v(FormField::Username),
      email: v(FormField::Email),
      phone: v(FormField::Phone),
      website: v(FormField::Website),
      address: Address {
        street: v(FormField::Street),
        suite: v(FormField::Suite),
        city: v(FormField::City),
        zipcode: v(FormField::Zipcode),
        geo: Geo {
          lat: v(FormField::Lat),
          lng: v(FormField::Lng),
        },
      },
      company: Company {
        name: v(FormField::CompanyName),
        catch_phrase: v(FormField::CatchPhrase),
        bs: v(FormField::Bs),
      },
    })
  }
}

/// Check required fields and the email shape.
pub fn validate(form: &UserForm) -> ValidationErrors {
  let mut errors = BTreeMap::new();

  for field in FormField::ALL {
    if let Some(message) = field.required_message() {
      if form.value(field).trim().is_empty() {
        errors.insert(field, message.to_string());
      }
    }
  }

  if !errors.contains_key(&FormField::Email) && !EMAIL_RE.is_match(form.value(FormField::Email)) {
    errors.insert(
      FormField::Email,
      "Please enter a valid email address".to_string(),
    );
  }

  ValidationErrors(errors)
}
