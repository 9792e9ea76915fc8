//! Service-side dispatcher.
//!
//! [`ComposerStub::on_transact`] turns one request parcel into one reply
//! parcel:
//!
//! 1. Map the code to a [`MethodCode`]. Unknown codes go to the base handler.
//! 2. Check the interface token. A mismatch answers `PERMISSION_DENIED`.
//! 3. Decode every argument. A decode failure answers the error's status.
//! 4. Invoke the service and encode its results after an `OK` status.
//!
//! Steps 2 and 3 complete before the service sees anything, so a rejected
//! request has no side effects.
//!
//! # Reply Layout
//!
//! Every reply starts with an `i32` transaction status. `OK` is followed by
//! the operation's results; any other status stands alone.
//!
//! # Security
//!
//! - **Untrusted Input**: request bytes are attacker-controlled. All decoding
//!   is bounds-checked by the parcel reader and limited by the stub's
//!   [`CodecLimits`].
//! - **No Panics**: every decode failure becomes a status reply. The stub
//!   never unwinds on malformed input.

use lumen_proto::{
    CodecLimits, ComposerState, DisplayInfo, DisplayState, MethodCode, Parcel, ParcelReader,
    PixelFormat, ProtocolError, Status, SURFACE_COMPOSER_DESCRIPTOR, TransactFlags,
    TransactionFlags,
    codes::{INTERFACE_TRANSACTION, PING_TRANSACTION},
};

use crate::{
    composer::SurfaceComposer,
    error::TransportError,
    transport::{Transaction, Transport},
};

/// Dispatches decoded requests to a [`SurfaceComposer`].
///
/// The stub holds no per-call state and can be shared across threads.
#[derive(Debug)]
pub struct ComposerStub<S> {
    service: S,
    limits: CodecLimits,
}

impl<S: SurfaceComposer> ComposerStub<S> {
    /// Wrap a service with default codec limits
    pub fn new(service: S) -> Self {
        Self::with_limits(service, CodecLimits::default())
    }

    /// Wrap a service with explicit codec limits for requests and replies
    pub fn with_limits(service: S, limits: CodecLimits) -> Self {
        Self { service, limits }
    }

    /// The wrapped service
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Limits applied to incoming requests
    pub fn limits(&self) -> CodecLimits {
        self.limits
    }

    /// Handle one transaction and produce its reply.
    ///
    /// Never fails: every error is reported through the reply status.
    pub fn on_transact(&self, code: u32, data: &Parcel, flags: TransactFlags) -> Parcel {
        let Some(method) = MethodCode::from_u32(code) else {
            return self.on_base_transact(code, data);
        };

        tracing::debug!(
            method = method.name(),
            code,
            one_way = flags.contains(TransactFlags::ONE_WAY),
            bytes = data.len(),
            objects = data.objects().len(),
            "Dispatching transaction"
        );

        match self.dispatch(method, data) {
            Ok(reply) => reply,
            Err(err @ ProtocolError::InterfaceMismatch { .. }) => {
                tracing::warn!(method = method.name(), error = %err, "Rejected interface token");
                Parcel::from_status(err.status())
            },
            Err(err) => {
                tracing::warn!(method = method.name(), error = %err, "Malformed request");
                Parcel::from_status(err.status())
            },
        }
    }

    fn on_base_transact(&self, code: u32, data: &Parcel) -> Parcel {
        match code {
            PING_TRANSACTION => Parcel::from_status(Status::OK),
            INTERFACE_TRANSACTION => {
                let mut reply = Parcel::with_limits(self.limits);
                let written = reply
                    .write_status(Status::OK)
                    .and_then(|()| reply.write_string(SURFACE_COMPOSER_DESCRIPTOR));
                match written {
                    Ok(()) => reply,
                    Err(err) => Parcel::from_status(err.status()),
                }
            },
            _ => {
                tracing::warn!(code, bytes = data.len(), "Unknown transaction code");
                Parcel::from_status(Status::UNKNOWN_TRANSACTION)
            },
        }
    }

    fn dispatch(&self, method: MethodCode, data: &Parcel) -> Result<Parcel, ProtocolError> {
        if data.len() > self.limits.max_parcel_bytes {
            return Err(ProtocolError::ParcelTooLarge {
                size: data.len(),
                max: self.limits.max_parcel_bytes,
            });
        }

        let mut request = data.reader().with_limits(self.limits);
        request.enforce_interface(SURFACE_COMPOSER_DESCRIPTOR)?;

        let mut reply = Parcel::with_limits(self.limits);
        reply.write_status(Status::OK)?;

        match method {
            MethodCode::CreateConnection => {
                let connection = self.service.create_connection();
                reply.write_object(Some(&connection))?;
            },
            MethodCode::CreateGraphicBufferAllocator => {
                let allocator = self.service.create_graphic_buffer_allocator();
                reply.write_object(Some(&allocator))?;
            },
            MethodCode::GetControlBlock => {
                let heap = self.service.get_control_block();
                reply.write_object(heap.as_ref())?;
            },
            MethodCode::SetTransactionState => {
                let (state, displays, flags) = read_transaction_state(&mut request)?;
                self.service.set_transaction_state(state, displays, flags);
            },
            MethodCode::BootFinished => {
                self.service.boot_finished();
            },
            MethodCode::CaptureScreen => {
                let display = request.read_object()?;
                let req_width = request.read_u32()?;
                let req_height = request.read_u32()?;
                let min_layer_z = request.read_u32()?;
                let max_layer_z = request.read_u32()?;

                let result = self.service.capture_screen(
                    display,
                    req_width,
                    req_height,
                    min_layer_z,
                    max_layer_z,
                );
                match result {
                    Ok(capture) => {
                        reply.write_object(Some(&capture.heap))?;
                        reply.write_u32(capture.width)?;
                        reply.write_u32(capture.height)?;
                        reply.write_i32(capture.format.0)?;
                        reply.write_status(Status::OK)?;
                    },
                    Err(status) => {
                        reply.write_object(None)?;
                        reply.write_u32(0)?;
                        reply.write_u32(0)?;
                        reply.write_i32(PixelFormat::UNKNOWN.0)?;
                        reply.write_status(status)?;
                    },
                }
            },
            MethodCode::AuthenticateSurfaceTexture => {
                let texture = request.read_object()?;
                let authentic = self.service.authenticate_surface_texture(texture);
                reply.write_bool(authentic)?;
            },
            MethodCode::CreateDisplayEventConnection => {
                let connection = self.service.create_display_event_connection();
                reply.write_object(Some(&connection))?;
            },
            MethodCode::CreateDisplay => {
                let name = request.read_string()?;
                let secure = request.read_bool()?;
                let display = self.service.create_display(&name, secure);
                reply.write_object(display.as_ref())?;
            },
            MethodCode::GetBuiltInDisplay => {
                let id = request.read_i32()?;
                let display = self.service.get_built_in_display(id);
                reply.write_object(display.as_ref())?;
            },
            MethodCode::Blank => {
                let display = request.read_object()?;
                self.service.blank(display);
            },
            MethodCode::Unblank => {
                let display = request.read_object()?;
                self.service.unblank(display);
            },
            MethodCode::GetDisplayInfo => {
                let display = request.read_object()?;
                let (info, status) = match self.service.get_display_info(display) {
                    Ok(info) => (info, Status::OK),
                    Err(status) => (DisplayInfo::default(), status),
                };
                reply.write_record(&info)?;
                reply.write_status(status)?;
            },
        }

        Ok(reply)
    }
}

type TransactionState = (Vec<ComposerState>, Vec<DisplayState>, TransactionFlags);

fn read_transaction_state(request: &mut ParcelReader<'_>) -> Result<TransactionState, ProtocolError> {
    let state = request.read_sequence::<ComposerState>()?;
    let displays = request.read_sequence::<DisplayState>()?;
    let flags = TransactionFlags::from_raw(request.read_u32()?);
    Ok((state, displays, flags))
}

/// In-process dispatch: the stub is its own transport.
impl<S: SurfaceComposer> Transport for ComposerStub<S> {
    fn transact(&self, txn: Transaction) -> Result<Parcel, TransportError> {
        Ok(self.on_transact(txn.code, &txn.data, txn.flags))
    }
}
