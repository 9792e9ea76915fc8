//! Client-side proxy.
//!
//! Each method opens a request parcel, writes the interface token and the
//! arguments in declared order, sends it with the operation's method code,
//! checks the reply status and reads the results in declared order.
//!
//! # Error Mapping
//!
//! | Reply status          | Error                            |
//! |-----------------------|----------------------------------|
//! | `PERMISSION_DENIED`   | [`CallError::ProtocolMismatch`]  |
//! | `UNKNOWN_TRANSACTION` | [`CallError::Unsupported`]       |
//! | `DEAD_OBJECT`         | [`CallError::Transport`]         |
//! | other non-`OK`        | [`CallError::Rejected`]          |
//!
//! Operations that return an application status after their results
//! (`captureScreen`, `getDisplayInfo`) report a non-`OK` value as
//! [`CallError::Status`].

use lumen_proto::{
    CodecLimits, ComposerState, DisplayInfo, DisplayState, MethodCode, ObjectRef, Parcel,
    ParcelReader, PixelFormat, ProtocolError, ReferenceError, Status, SURFACE_COMPOSER_DESCRIPTOR,
    TransactFlags, TransactionFlags,
    codes::{INTERFACE_TRANSACTION, PING_TRANSACTION},
};

use crate::{
    composer::ScreenCapture,
    error::{CallError, TransportError},
    transport::{Transaction, Transport},
};

/// Client handle to a remote surface composer.
#[derive(Debug, Clone)]
pub struct ComposerProxy<T> {
    transport: T,
    limits: CodecLimits,
}

impl<T: Transport> ComposerProxy<T> {
    /// Create a proxy over a transport with default codec limits
    pub fn new(transport: T) -> Self {
        Self::with_limits(transport, CodecLimits::default())
    }

    /// Create a proxy with explicit limits for requests and replies
    pub fn with_limits(transport: T, limits: CodecLimits) -> Self {
        Self { transport, limits }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open a client connection context.
    ///
    /// # Errors
    ///
    /// `CallError::Reference(ReferenceError::Null)` if the service returned
    /// no connection, plus the usual call failures.
    pub fn create_connection(&self) -> Result<ObjectRef, CallError> {
        let data = self.request()?;
        let connection = self.call(MethodCode::CreateConnection, data, |reply| reply.read_object())?;
        Ok(connection.ok_or(ReferenceError::Null)?)
    }

    /// Obtain the graphic buffer allocator
    pub fn create_graphic_buffer_allocator(&self) -> Result<ObjectRef, CallError> {
        let data = self.request()?;
        let allocator =
            self.call(MethodCode::CreateGraphicBufferAllocator, data, |reply| reply.read_object())?;
        Ok(allocator.ok_or(ReferenceError::Null)?)
    }

    /// Shared control block heap, if the service has one
    pub fn get_control_block(&self) -> Result<Option<ObjectRef>, CallError> {
        let data = self.request()?;
        self.call(MethodCode::GetControlBlock, data, |reply| reply.read_object())
    }

    /// Submit layer and display changes as one batch.
    ///
    /// Both sequences arrive at the service in the order given here.
    pub fn set_transaction_state(
        &self,
        state: &[ComposerState],
        displays: &[DisplayState],
        flags: TransactionFlags,
    ) -> Result<(), CallError> {
        let mut data = self.request()?;
        data.write_records(state)?;
        data.write_records(displays)?;
        data.write_u32(flags.bits())?;
        self.call(MethodCode::SetTransactionState, data, |_| Ok(()))
    }

    /// Tell the service that client-side boot setup is complete.
    ///
    /// Sent one-way: there are no results, but the call still blocks until
    /// the transport has delivered it.
    pub fn boot_finished(&self) -> Result<(), CallError> {
        let data = self.request()?;
        self.notify(MethodCode::BootFinished, data)
    }

    /// Capture a display into a shared heap.
    ///
    /// Only layers with z in `min_layer_z..=max_layer_z` are captured. A
    /// requested size of zero means the display's full size.
    ///
    /// # Errors
    ///
    /// - `CallError::Status` if the service reported failure
    /// - `CallError::Reference(ReferenceError::Null)` if it reported success
    ///   without a heap
    pub fn capture_screen(
        &self,
        display: &ObjectRef,
        req_width: u32,
        req_height: u32,
        min_layer_z: u32,
        max_layer_z: u32,
    ) -> Result<ScreenCapture, CallError> {
        let mut data = self.request()?;
        data.write_object(Some(display))?;
        data.write_u32(req_width)?;
        data.write_u32(req_height)?;
        data.write_u32(min_layer_z)?;
        data.write_u32(max_layer_z)?;

        let (heap, width, height, format, status) =
            self.call(MethodCode::CaptureScreen, data, |reply| {
                let heap = reply.read_object()?;
                let width = reply.read_u32()?;
                let height = reply.read_u32()?;
                let format = PixelFormat(reply.read_i32()?);
                let status = reply.read_status()?;
                Ok((heap, width, height, format, status))
            })?;

        if !status.is_ok() {
            return Err(CallError::Status(status));
        }
        let heap = heap.ok_or(ReferenceError::Null)?;
        Ok(ScreenCapture { heap, width, height, format })
    }

    /// True only if the service issued `texture`.
    ///
    /// Every failure, local or remote, is logged and reported as `false`.
    pub fn authenticate_surface_texture(&self, texture: &ObjectRef) -> bool {
        let result = self.request().and_then(|mut data| {
            data.write_object(Some(texture))?;
            self.call(MethodCode::AuthenticateSurfaceTexture, data, |reply| reply.read_bool())
        });

        match result {
            Ok(authentic) => authentic,
            Err(err) => {
                tracing::error!(
                    texture = %texture.id(),
                    error = %err,
                    "Failed to authenticate surface texture"
                );
                false
            },
        }
    }

    /// Open a vsync/hotplug event stream
    pub fn create_display_event_connection(&self) -> Result<ObjectRef, CallError> {
        let data = self.request()?;
        let connection =
            self.call(MethodCode::CreateDisplayEventConnection, data, |reply| reply.read_object())?;
        Ok(connection.ok_or(ReferenceError::Null)?)
    }

    /// Create a virtual display. `None` if the service declined.
    pub fn create_display(&self, name: &str, secure: bool) -> Result<Option<ObjectRef>, CallError> {
        let mut data = self.request()?;
        data.write_string(name)?;
        data.write_bool(secure)?;
        self.call(MethodCode::CreateDisplay, data, |reply| reply.read_object())
    }

    /// Look up a built-in display. `None` if there is no display with `id`.
    pub fn get_built_in_display(&self, id: i32) -> Result<Option<ObjectRef>, CallError> {
        let mut data = self.request()?;
        data.write_i32(id)?;
        self.call(MethodCode::GetBuiltInDisplay, data, |reply| reply.read_object())
    }

    /// Power a display down. One-way, like [`boot_finished`](Self::boot_finished).
    pub fn blank(&self, display: &ObjectRef) -> Result<(), CallError> {
        let mut data = self.request()?;
        data.write_object(Some(display))?;
        self.notify(MethodCode::Blank, data)
    }

    /// Power a display up. One-way, like [`boot_finished`](Self::boot_finished).
    pub fn unblank(&self, display: &ObjectRef) -> Result<(), CallError> {
        let mut data = self.request()?;
        data.write_object(Some(display))?;
        self.notify(MethodCode::Unblank, data)
    }

    /// Fetch a display's descriptor.
    ///
    /// The block is always transferred, but only returned when the service
    /// reported `OK`.
    pub fn get_display_info(&self, display: &ObjectRef) -> Result<DisplayInfo, CallError> {
        let mut data = self.request()?;
        data.write_object(Some(display))?;

        let (info, status) = self.call(MethodCode::GetDisplayInfo, data, |reply| {
            let info = reply.read_record::<DisplayInfo>()?;
            let status = reply.read_status()?;
            Ok((info, status))
        })?;

        if !status.is_ok() {
            return Err(CallError::Status(status));
        }
        Ok(info)
    }

    /// Check that the remote is alive
    pub fn ping(&self) -> Result<(), CallError> {
        let data = Parcel::with_limits(self.limits);
        self.call_raw(PING_TRANSACTION, data, |_| Ok(()))
    }

    /// Interface descriptor the remote implements
    pub fn interface_descriptor(&self) -> Result<String, CallError> {
        let data = Parcel::with_limits(self.limits);
        self.call_raw(INTERFACE_TRANSACTION, data, |reply| reply.read_string())
    }

    fn request(&self) -> Result<Parcel, CallError> {
        let mut data = Parcel::with_limits(self.limits);
        data.write_interface_token(SURFACE_COMPOSER_DESCRIPTOR)?;
        Ok(data)
    }

    /// Send a one-way notification and wait for delivery
    fn notify(&self, method: MethodCode, data: Parcel) -> Result<(), CallError> {
        let txn = Transaction { code: method.to_u32(), flags: TransactFlags::ONE_WAY, data };
        let reply = self.transport.transact(txn)?;
        // one-way transports may answer with an empty reply
        if reply.is_empty() {
            return Ok(());
        }
        let mut reader = reply.reader().with_limits(self.limits);
        check_status(method.to_u32(), reader.read_status()?)
    }

    fn call<R>(
        &self,
        method: MethodCode,
        data: Parcel,
        read: impl FnOnce(&mut ParcelReader<'_>) -> Result<R, ProtocolError>,
    ) -> Result<R, CallError> {
        self.call_raw(method.to_u32(), data, read)
    }

    fn call_raw<R>(
        &self,
        code: u32,
        data: Parcel,
        read: impl FnOnce(&mut ParcelReader<'_>) -> Result<R, ProtocolError>,
    ) -> Result<R, CallError> {
        let reply = self.transport.transact(Transaction::new(code, data))?;
        let mut reader = reply.reader().with_limits(self.limits);
        check_status(code, reader.read_status()?)?;
        Ok(read(&mut reader)?)
    }
}

fn check_status(code: u32, status: Status) -> Result<(), CallError> {
    match status {
        Status::OK => Ok(()),
        Status::PERMISSION_DENIED => Err(CallError::ProtocolMismatch),
        Status::UNKNOWN_TRANSACTION => Err(CallError::Unsupported { code }),
        Status::DEAD_OBJECT => Err(CallError::Transport(TransportError::DeadObject)),
        other => Err(CallError::Rejected(other)),
    }
}
