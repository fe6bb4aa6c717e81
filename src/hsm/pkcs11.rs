/*!
 * PKCS#11 session provider
 *
 * Loads a PKCS#11 module, selects a slot, and opens authenticated
 * read-write sessions for the session pool. Imported EC private keys are
 * stored as sensitive, non-extractable objects together with a matching
 * public key object, both identified by the key's SKI.
 */

use std::path::Path;
use std::sync::Arc;

use cryptoki::context::{CInitializeArgs, Pkcs11};
use cryptoki::error::{Error as Pkcs11Error, RvError};
use cryptoki::object::{Attribute, KeyType, ObjectClass};
use cryptoki::session::{Session, UserType};
use cryptoki::slot::Slot;
use cryptoki::types::AuthPin;
use pkcs8::der::asn1::OctetStringRef;
use pkcs8::der::Encode;

use super::{HsmHandle, HsmSession, PrivateKeyMaterial, SessionProvider};
use crate::config::HsmConfig;
use crate::error::HsmError;
use crate::secure_memory::SecureBytes;

/// Opens sessions on one PKCS#11 slot
pub struct Pkcs11SessionProvider {
    context: Arc<Pkcs11>,
    slot: Slot,
    user_pin: Option<SecureBytes>,
}

impl std::fmt::Debug for Pkcs11SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs11SessionProvider")
            .field("slot", &self.slot.id())
            .field("user_pin", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Pkcs11SessionProvider {
    /// Load and initialize the module named in `config` and pick its slot
    ///
    /// The slot is chosen by `slot_id` if set, else by `token_label`, else
    /// the first slot holding a token.
    pub fn connect(config: &HsmConfig) -> Result<Self, HsmError> {
        if !Path::new(&config.library_path).exists() {
            return Err(HsmError::device(
                "connect",
                &format!("PKCS#11 library not found: {}", config.library_path),
            ));
        }

        log::info!("Initializing PKCS#11 library: {}", config.library_path);

        let context = Pkcs11::new(&config.library_path).map_err(|e| {
            HsmError::device("connect", &format!("Failed to load PKCS#11 library: {}", e))
        })?;

        context.initialize(CInitializeArgs::OsThreads).map_err(|e| {
            HsmError::device("connect", &format!("Failed to initialize PKCS#11 library: {}", e))
        })?;

        let slots = context
            .get_slots_with_token()
            .map_err(|e| HsmError::device("connect", &format!("Failed to get slots: {}", e)))?;

        if slots.is_empty() {
            return Err(HsmError::device("connect", "No slots with tokens found"));
        }

        let slot = if let Some(slot_id) = config.slot_id {
            slots
                .into_iter()
                .find(|s| s.id() == slot_id)
                .ok_or_else(|| HsmError::device("connect", &format!("Slot {} not found", slot_id)))?
        } else if let Some(ref token_label) = config.token_label {
            slots
                .into_iter()
                .find(|s| {
                    context
                        .get_token_info(*s)
                        .map(|info| info.label().trim() == token_label.trim())
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    HsmError::device(
                        "connect",
                        &format!("Token with label '{}' not found", token_label),
                    )
                })?
        } else {
            slots[0]
        };

        log::info!("Using slot: {}", slot.id());

        Ok(Self {
            context: Arc::new(context),
            slot,
            user_pin: config.user_pin.clone(),
        })
    }

    pub fn slot_id(&self) -> u64 {
        self.slot.id()
    }

    fn login(&self, session: &Session) -> Result<(), HsmError> {
        let pin = match &self.user_pin {
            Some(pin) if !pin.is_empty() => pin,
            _ => return Ok(()),
        };

        let auth_pin = AuthPin::new(String::from_utf8_lossy(pin.as_bytes()).to_string());
        match session.login(UserType::User, Some(&auth_pin)) {
            Ok(()) => {
                log::info!("Logged in to HSM slot {}", self.slot.id());
                Ok(())
            }
            // login state is per token, so later sessions inherit it
            Err(Pkcs11Error::Pkcs11(RvError::UserAlreadyLoggedIn, ..)) => Ok(()),
            Err(e) => Err(HsmError::session("login", &format!("Failed to login to HSM: {}", e))),
        }
    }
}

impl SessionProvider for Pkcs11SessionProvider {
    type Session = Pkcs11Session;

    fn open_session(&self) -> Result<Pkcs11Session, HsmError> {
        let session = self
            .context
            .open_rw_session(self.slot)
            .map_err(|e| HsmError::session("open_session", &format!("Failed to open session: {}", e)))?;

        self.login(&session)?;

        Ok(Pkcs11Session {
            session,
            slot_id: self.slot.id(),
        })
    }

    fn check_session(&self, session: &mut Pkcs11Session) -> Result<(), HsmError> {
        session
            .session
            .get_session_info()
            .map(|_| ())
            .map_err(|e| HsmError::session("check_session", &format!("Session validation failed: {}", e)))
    }
}

/// One authenticated read-write session
pub struct Pkcs11Session {
    session: Session,
    slot_id: u64,
}

impl Pkcs11Session {
    fn private_key_template(material: &PrivateKeyMaterial, label: &[u8]) -> Vec<Attribute> {
        vec![
            Attribute::Class(ObjectClass::PRIVATE_KEY),
            Attribute::KeyType(KeyType::EC),
            Attribute::Token(!material.is_ephemeral()),
            Attribute::Private(true),
            Attribute::Sensitive(true),
            Attribute::Extractable(false),
            Attribute::Sign(true),
            Attribute::Id(material.ski().as_bytes().to_vec()),
            Attribute::Label(label.to_vec()),
            Attribute::EcParams(material.curve().ec_params_der().to_vec()),
            Attribute::Value(material.scalar().to_vec()),
        ]
    }

    fn public_key_template(
        material: &PrivateKeyMaterial,
        label: &[u8],
    ) -> Result<Vec<Attribute>, HsmError> {
        let ec_point = OctetStringRef::new(material.public_point())
            .and_then(|point| point.to_der())
            .map_err(|e| HsmError::UnsupportedKey(format!("invalid EC point: {}", e)))?;

        Ok(vec![
            Attribute::Class(ObjectClass::PUBLIC_KEY),
            Attribute::KeyType(KeyType::EC),
            Attribute::Token(!material.is_ephemeral()),
            Attribute::Private(false),
            Attribute::Verify(true),
            Attribute::Id(material.ski().as_bytes().to_vec()),
            Attribute::Label(label.to_vec()),
            Attribute::EcParams(material.curve().ec_params_der().to_vec()),
            Attribute::EcPoint(ec_point),
        ])
    }
}

impl HsmSession for Pkcs11Session {
    fn create_private_key(&mut self, material: &PrivateKeyMaterial) -> Result<HsmHandle, HsmError> {
        let label = material.ski().to_hex();
        let public_template = Self::public_key_template(material, label.as_bytes())?;

        // the template holds a copy of the scalar; wipe it once the call returns
        let mut private_template = Self::private_key_template(material, label.as_bytes());
        let created = self.session.create_object(&private_template);
        if let Some(Attribute::Value(value)) = private_template.last_mut() {
            zeroize::Zeroize::zeroize(value);
        }
        drop(private_template);

        let private_handle = created.map_err(|e| {
            HsmError::device("create_object", &format!("Failed to create private key object: {}", e))
        })?;

        if let Err(e) = self.session.create_object(&public_template) {
            if let Err(cleanup) = self.session.destroy_object(private_handle) {
                log::warn!("Failed to remove orphaned private key object {}: {}", label, cleanup);
            }
            return Err(HsmError::device(
                "create_object",
                &format!("Failed to create public key object: {}", e),
            ));
        }

        log::info!("Stored private key {} in HSM slot {}", label, self.slot_id);

        Ok(HsmHandle::new(
            self.slot_id,
            material.ski().as_bytes().to_vec(),
            label,
        ))
    }
}
