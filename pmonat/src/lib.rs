//! # pmonat - Client UPnP Internet Gateway Device
//!
//! Découverte des routeurs du réseau local par SSDP, lecture de leur
//! description et pilotage de leurs services WAN par SOAP (redirections de
//! ports, adresse externe, état de la connexion).
//!
//! ## Couches
//!
//! - [`ssdp`] : transport UDP multicast et recherche `M-SEARCH`
//! - [`upnp`] : description des devices, SCPD et clients WAN typés
//! - [`soap`] : codec de l'enveloppe et transport HTTP
//! - [`nat`] : façade [`Nat`] et découverte concurrente
//!
//! ## Exemple
//!
//! ```no_run
//! use pmonat::Nat;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), pmonat::NatError> {
//! let cancel = CancellationToken::new();
//! for nat in pmonat::discover_nats(&cancel).await? {
//!     println!("{} {}", nat.nat_type(), nat.device_name());
//!     println!("external address: {}", nat.get_external_address().await?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config_ext;
pub mod errors;
pub mod http;
pub mod logger;
pub mod nat;
pub mod soap;
pub mod ssdp;
pub mod upnp;

pub use config_ext::{NatConfig, NatConfigExt};
pub use errors::NatError;
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use nat::{Discover, Nat, Protocol, UpnpNat, discover_nats, in_gateway_local_ip};
