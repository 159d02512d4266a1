//! Envelope-Datenmodell
//!
//! Jede Nachricht zwischen Client und Server ist genau ein [`Envelope`]
//! mit genau einem [`Paket`]. Die Serialisierung ist JSON via serde,
//! Byte-Felder werden als Base64-Strings uebertragen.
//!
//! ```text
//! {"source":"CLIENT","from_username":"alice",
//!  "payload":{"login":{"status":"REQUEST_TO_LOGIN"}}}
//! ```
//!
//! Ein unbekanntes oder fehlendes `payload` ist ein Deserialisierungsfehler
//! und wird vom Codec als [`crate::FramingError`] gemeldet.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Absender-Seite eines Envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quelle {
    Client,
    Server,
}

/// Die einzige Draht-Einheit des Protokolls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub source: Quelle,
    /// Benutzername des Absenders. Bei weitergeleiteten Envelopes setzt der
    /// Server hier den authentifizierten Namen ein.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_username: Option<String>,
    pub payload: Paket,
}

impl Envelope {
    /// Envelope vom Client, optional mit Absendernamen
    pub fn vom_client(from_username: Option<String>, payload: Paket) -> Self {
        Self {
            source: Quelle::Client,
            from_username,
            payload,
        }
    }

    /// Envelope vom Server ohne Absendernamen
    pub fn vom_server(payload: Paket) -> Self {
        Self {
            source: Quelle::Server,
            from_username: None,
            payload,
        }
    }

    /// Ersetzt den Absendernamen
    pub fn mit_absender(mut self, username: impl Into<String>) -> Self {
        self.from_username = Some(username.into());
        self
    }

    /// Absendername oder leerer String
    pub fn absender(&self) -> &str {
        self.from_username.as_deref().unwrap_or_default()
    }
}

/// Payload-Variante eines Envelopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Paket {
    Login(LoginPacket),
    Register(RegisterPacket),
    UserList(UserListPacket),
    ExchangeKey(ExchangeKeyPacket),
    Chat(ChatPacket),
}

impl Paket {
    /// Kurzname fuer Logs
    pub fn art(&self) -> &'static str {
        match self {
            Self::Login(_) => "login",
            Self::Register(_) => "register",
            Self::UserList(_) => "user_list",
            Self::ExchangeKey(_) => "exchange_key",
            Self::Chat(_) => "chat",
        }
    }
}

impl From<LoginPacket> for Paket {
    fn from(p: LoginPacket) -> Self {
        Self::Login(p)
    }
}

impl From<RegisterPacket> for Paket {
    fn from(p: RegisterPacket) -> Self {
        Self::Register(p)
    }
}

impl From<UserListPacket> for Paket {
    fn from(p: UserListPacket) -> Self {
        Self::UserList(p)
    }
}

impl From<ExchangeKeyPacket> for Paket {
    fn from(p: ExchangeKeyPacket) -> Self {
        Self::ExchangeKey(p)
    }
}

impl From<ChatPacket> for Paket {
    fn from(p: ChatPacket) -> Self {
        Self::Chat(p)
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginStatus {
    RequestToLogin,
    EncryptedToken,
    DecryptedToken,
    LoginSuccess,
    LoginFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPacket {
    pub status: LoginStatus,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_option")]
    pub token: Option<Vec<u8>>,
}

impl LoginPacket {
    pub fn neu(status: LoginStatus) -> Self {
        Self {
            status,
            token: None,
        }
    }

    pub fn mit_token(status: LoginStatus, token: Vec<u8>) -> Self {
        Self {
            status,
            token: Some(token),
        }
    }
}

// ---------------------------------------------------------------------------
// Registrierung
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterStatus {
    RequestToRegister,
    RegisterSuccess,
    RegisterFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPacket {
    pub status: RegisterStatus,
    /// Roher RSA-Modulus (big-endian)
    #[serde(default, with = "base64_bytes")]
    pub public_key: Vec<u8>,
}

impl RegisterPacket {
    pub fn neu(status: RegisterStatus) -> Self {
        Self {
            status,
            public_key: Vec::new(),
        }
    }

    pub fn anfrage(public_key: Vec<u8>) -> Self {
        Self {
            status: RegisterStatus::RequestToRegister,
            public_key,
        }
    }
}

// ---------------------------------------------------------------------------
// Benutzerliste
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserListStatus {
    RequestUserList,
    UserList,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListPacket {
    pub status: UserListStatus,
    /// Reihenfolge ohne Bedeutung
    #[serde(default)]
    pub users: Vec<String>,
}

impl UserListPacket {
    pub fn neu(status: UserListStatus) -> Self {
        Self {
            status,
            users: Vec::new(),
        }
    }

    pub fn liste(users: Vec<String>) -> Self {
        Self {
            status: UserListStatus::UserList,
            users,
        }
    }
}

// ---------------------------------------------------------------------------
// Schluesselaustausch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeKeyStatus {
    RequestForUserPublicKey,
    PubKeyFromServer,
    RequestForUserPublicKeyPassive,
    PubKeyFromServerPassive,
    ReqForSymKey,
    ReplyWithSymKey,
    Error,
}

impl ExchangeKeyStatus {
    /// Direkte Antworten auf eine eigene Anfrage des Clients
    pub fn ist_aktiv(&self) -> bool {
        matches!(
            self,
            Self::RequestForUserPublicKey
                | Self::PubKeyFromServer
                | Self::ReplyWithSymKey
                | Self::Error
        )
    }

    /// Unaufgeforderte Anfragen eines Peers, auf die der Client reagieren muss
    pub fn ist_passiv(&self) -> bool {
        matches!(self, Self::ReqForSymKey | Self::PubKeyFromServerPassive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeKeyPacket {
    pub status: ExchangeKeyStatus,
    /// RSA-Modulus aus dem Verzeichnis
    #[serde(default, with = "base64_bytes")]
    pub key: Vec<u8>,
    #[serde(default, with = "base64_bytes")]
    pub encrypted_message: Vec<u8>,
    #[serde(default)]
    pub to_username: String,
}

impl ExchangeKeyPacket {
    pub fn neu(status: ExchangeKeyStatus, to_username: impl Into<String>) -> Self {
        Self {
            status,
            key: Vec::new(),
            encrypted_message: Vec::new(),
            to_username: to_username.into(),
        }
    }

    pub fn mit_key(mut self, key: Vec<u8>) -> Self {
        self.key = key;
        self
    }

    pub fn mit_nachricht(mut self, encrypted_message: Vec<u8>) -> Self {
        self.encrypted_message = encrypted_message;
        self
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatStatus {
    #[default]
    Message,
    /// Server-Antwort: Empfaenger ist nicht angemeldet
    DeliveryFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPacket {
    #[serde(default)]
    pub status: ChatStatus,
    pub to_username: String,
    /// Chiffrat, fuer den Server opak
    #[serde(default, with = "base64_bytes")]
    pub message: Vec<u8>,
}

impl ChatPacket {
    pub fn nachricht(to_username: impl Into<String>, message: Vec<u8>) -> Self {
        Self {
            status: ChatStatus::Message,
            to_username: to_username.into(),
            message,
        }
    }

    pub fn nicht_zustellbar(to_username: impl Into<String>) -> Self {
        Self {
            status: ChatStatus::DeliveryFailed,
            to_username: to_username.into(),
            message: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Base64-Hilfen fuer serde
// ---------------------------------------------------------------------------

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

mod base64_option {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_some(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
