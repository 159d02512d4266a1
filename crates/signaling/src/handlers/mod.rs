//! Handler fuer alle Paketarten
//!
//! Jeder Handler ist fuer genau eine Payload-Variante zustaendig und
//! liefert einen [`crate::dispatcher::Ausgang`]. Fluechtiger Zustand
//! (Login-Token) liegt im [`crate::connection::VerbindungsKontext`].

pub mod chat;
pub mod key_exchange;
pub mod login;
pub mod register;
pub mod user_list;
