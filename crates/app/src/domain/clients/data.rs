//! Clients Data

/// Contact details supplied alongside a booking request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContact {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}
