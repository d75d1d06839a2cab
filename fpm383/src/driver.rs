//! High-level driver interface

use std::str::FromStr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fpm383_core::constants::{
    BROADCAST_ADDRESS, DEFAULT_CAPTURE_TIMEOUT_MS, DEFAULT_COMMAND_TIMEOUT_MS,
    DEFAULT_STAGE_TIMEOUT_MS, MAX_DATA_PACKETS, READY_SIGNAL, SEARCH_ALL, packet_sizes, registers,
};
use fpm383_core::params::{self, EnrollFlags, IdentifyFlags};
use fpm383_core::{Command, ExchangeState, Packet, PacketKind, Session};
use fpm383_transport::{SerialTransport, TcpTransport, Transport};
use fpm383_types::matching::parse_u16;
use fpm383_types::{Flow, IndexTable, SearchHit, SystemParameters};

use crate::error::{Error, Result};
use crate::exchange;
use crate::stream::{StageReport, StageStream};

/// Successful answer to a single command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Command that was answered
    pub command: Command,

    /// Bytes after the confirmation code
    pub params: Bytes,
}

/// FPM383C fingerprint module
///
/// One outstanding request per module: every exchange holds the transport
/// lock from the request write to the last read, so a `Driver` can be shared
/// between tasks behind an `Arc`.
///
/// # Examples
///
/// ```no_run
/// use fpm383::Driver;
///
/// #[tokio::main]
/// async fn main() -> fpm383::Result<()> {
///     let driver = Driver::serial("/dev/ttyUSB0", 57_600);
///
///     driver.connect().await?;
///
///     let params = driver.read_system_parameters().await?;
///     println!("{}", params);
///
///     driver.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Driver {
    link: Mutex<Box<dyn Transport>>,
    endpoint: String,
    session: Session,
    command_timeout: Duration,
    capture_timeout: Duration,
    stage_timeout: Duration,
}

impl Driver {
    /// Create a driver over any transport
    pub fn open(transport: impl Transport + 'static) -> Self {
        Self {
            endpoint: transport.endpoint(),
            link: Mutex::new(Box::new(transport)),
            session: Session::new(BROADCAST_ADDRESS),
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            capture_timeout: Duration::from_millis(DEFAULT_CAPTURE_TIMEOUT_MS),
            stage_timeout: Duration::from_millis(DEFAULT_STAGE_TIMEOUT_MS),
        }
    }

    /// Create a driver on a serial port
    pub fn serial(path: impl Into<String>, baud_rate: u32) -> Self {
        Self::open(SerialTransport::new(path, baud_rate))
    }

    /// Create a driver behind a serial-to-TCP bridge
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::open(TcpTransport::new(host, port))
    }

    /// Set device address (default: broadcast `0xFFFFFFFF`)
    ///
    /// With a specific address, answers from other addresses are rejected.
    pub fn with_address(self, address: u32) -> Self {
        self.session.set_address(address);
        self
    }

    /// Set timeout for ordinary commands
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set timeout for commands that wait for a finger
    pub fn with_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// Set the idle window between stage packets of AutoEnroll/AutoIdentify
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Set the maximum payload per packet (32, 64, 128 or 256)
    pub fn with_max_payload(self, size: usize) -> Result<Self> {
        self.session.set_max_payload(size)?;
        Ok(self)
    }

    /// Exchange session (address, payload limit, exchange state)
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// State of the last exchange
    pub fn state(&self) -> ExchangeState {
        self.session.state()
    }

    /// Transport endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check if the transport is open
    pub async fn is_connected(&self) -> bool {
        self.link.lock().await.is_connected()
    }

    /// Open the transport
    pub async fn connect(&self) -> Result<()> {
        info!("Connecting to {}...", self.endpoint);

        self.link.lock().await.connect().await?;
        self.session.reset();

        info!("Connected to {}", self.endpoint);
        Ok(())
    }

    /// Close the transport
    pub async fn disconnect(&self) -> Result<()> {
        let mut link = self.link.lock().await;
        if !link.is_connected() {
            return Ok(());
        }

        info!("Disconnecting from {}...", self.endpoint);

        link.disconnect().await?;
        self.session.reset();

        info!("Disconnected");
        Ok(())
    }

    /// Wait for the power-on handshake byte
    ///
    /// The module sends a single `0x55` once it has booted. Returns `false`
    /// if nothing or something else arrives within `timeout`.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<bool> {
        let mut link = self.link.lock().await;

        match link.receive(1, timeout).await {
            Ok(byte) if byte.first() == Some(&READY_SIGNAL) => {
                info!("Module ready");
                Ok(true)
            }
            Ok(byte) => {
                warn!("Unexpected handshake byte: {}", hex::encode_upper(&byte));
                Ok(false)
            }
            Err(e) if e.is_timeout() => {
                warn!("No handshake within {:?}", timeout);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run a command by its manual name
    ///
    /// # Errors
    ///
    /// `Core(UnknownCommand)` for names outside the catalog, otherwise as
    /// [`Self::execute_command`].
    pub async fn execute(&self, name: &str, params: &[u8]) -> Result<Reply> {
        let command = Command::from_str(name)?;
        self.execute_command(command, params).await
    }

    /// Run one request/response exchange
    ///
    /// Composite and data-transfer commands have dedicated methods, since
    /// their answers span several packets.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no byte arrives before the deadline
    /// - `Core(..)` for malformed packets or unregistered confirmation codes
    /// - [`Error::UnexpectedCode`] for a code the command never returns
    /// - [`Error::SensorFailure`] for a documented failure code
    /// - [`Error::ShortResponse`] if a success lacks the promised fields
    pub async fn execute_command(&self, command: Command, params: &[u8]) -> Result<Reply> {
        if command.is_composite() {
            return Err(Error::InvalidArgument(format!(
                "{} reports stages, use the stream methods",
                command
            )));
        }
        if command.is_upload() || command == Command::DownChar {
            return Err(Error::InvalidArgument(format!(
                "{} transfers data packets, use the template/info page methods",
                command
            )));
        }

        let mut link = self.link.lock().await;
        self.round_trip(&mut **link, command, params).await
    }

    // Typed commands

    /// Capture a finger image for matching
    pub async fn get_image(&self) -> Result<()> {
        self.execute_command(Command::GetImage, &[]).await.map(drop)
    }

    /// Capture a finger image for enrollment
    pub async fn get_enroll_image(&self) -> Result<()> {
        self.execute_command(Command::GetEnrollImage, &[]).await.map(drop)
    }

    /// Extract features of the captured image into a template buffer
    pub async fn gen_char(&self, buffer_id: u8) -> Result<()> {
        self.execute_command(Command::GenChar, &params::buffer(buffer_id))
            .await
            .map(drop)
    }

    /// Compare the two template buffers, returning the match score
    pub async fn match_buffers(&self) -> Result<u16> {
        let reply = self.execute_command(Command::Match, &[]).await?;
        Ok(parse_u16("match score", &reply.params)?)
    }

    /// Search the library for the template in `buffer_id`
    pub async fn search(&self, buffer_id: u8, start_page: u16, page_count: u16) -> Result<SearchHit> {
        let reply = self
            .execute_command(Command::Search, &params::search(buffer_id, start_page, page_count))
            .await?;
        Ok(SearchHit::parse(&reply.params)?)
    }

    /// Merge the template buffers into one template
    pub async fn reg_model(&self) -> Result<()> {
        self.execute_command(Command::RegModel, &[]).await.map(drop)
    }

    /// Store a template buffer at a library page
    pub async fn store_char(&self, buffer_id: u8, page: u16) -> Result<()> {
        self.execute_command(Command::StoreChar, &params::buffer_page(buffer_id, page))
            .await
            .map(drop)
    }

    /// Load a library page into a template buffer
    pub async fn load_char(&self, buffer_id: u8, page: u16) -> Result<()> {
        self.execute_command(Command::LoadChar, &params::buffer_page(buffer_id, page))
            .await
            .map(drop)
    }

    /// Delete `count` templates starting at `page`
    pub async fn delete_char(&self, page: u16, count: u16) -> Result<()> {
        self.execute_command(Command::DeleteChar, &params::delete_range(page, count))
            .await
            .map(drop)
    }

    /// Clear the whole template library
    pub async fn empty(&self) -> Result<()> {
        warn!("Clearing fingerprint library");
        self.execute_command(Command::Empty, &[]).await.map(drop)
    }

    /// Write a system register
    ///
    /// Writing the packet size register also updates the session's payload
    /// limit.
    pub async fn write_reg(&self, register: u8, value: u8) -> Result<()> {
        self.execute_command(Command::WriteReg, &params::write_reg(register, value))
            .await?;

        if register == registers::PACKET_SIZE {
            if let Some(&size) = packet_sizes::BY_CODE.get(value as usize) {
                self.session.set_max_payload(size)?;
                debug!("Payload limit now {} bytes", size);
            }
        }

        Ok(())
    }

    /// Read the system parameter block
    ///
    /// Adopts the module's packet size as the session's payload limit.
    pub async fn read_system_parameters(&self) -> Result<SystemParameters> {
        let reply = self.execute_command(Command::ReadSysPara, &[]).await?;
        let parameters = SystemParameters::parse(&reply.params)?;

        self.session.set_max_payload(parameters.max_payload()?)?;

        debug!("System parameters: {}", parameters);
        Ok(parameters)
    }

    /// Number of stored templates
    pub async fn valid_template_count(&self) -> Result<u16> {
        let reply = self.execute_command(Command::ValidTemplateNum, &[]).await?;
        Ok(parse_u16("template count", &reply.params)?)
    }

    /// Occupancy bitmap of one index page
    pub async fn read_index_table(&self, page: u8) -> Result<IndexTable> {
        let reply = self.execute_command(Command::ReadIndexTable, &[page]).await?;
        Ok(IndexTable::parse(page, &reply.params)?)
    }

    /// Enter firmware upgrade mode
    pub async fn burn_code(&self, mode: u8) -> Result<()> {
        warn!("Entering firmware upgrade mode {}", mode);
        self.execute_command(Command::BurnCode, &[mode]).await.map(drop)
    }

    /// Put the module into low-power sleep
    pub async fn sleep(&self) -> Result<()> {
        self.execute_command(Command::Sleep, &[]).await.map(drop)
    }

    /// Abort a running AutoEnroll/AutoIdentify on the module side
    pub async fn cancel(&self) -> Result<()> {
        self.execute_command(Command::Cancel, &[]).await.map(drop)
    }

    // Data transfers

    /// Read a template buffer out of the module
    pub async fn upload_template(&self, buffer_id: u8) -> Result<Bytes> {
        let mut link = self.link.lock().await;
        self.round_trip(&mut **link, Command::UpChar, &params::buffer(buffer_id))
            .await?;
        self.read_data(&mut **link).await
    }

    /// Write a template into a template buffer
    ///
    /// The data is split into packets of the session's payload limit.
    pub async fn download_template(&self, buffer_id: u8, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidArgument("empty template".into()));
        }

        let chunk_size = self.session.max_payload();
        let packets = data.len().div_ceil(chunk_size);
        if packets > MAX_DATA_PACKETS {
            return Err(Error::DataOverrun {
                limit: MAX_DATA_PACKETS,
            });
        }

        let mut link = self.link.lock().await;
        self.round_trip(&mut **link, Command::DownChar, &params::buffer(buffer_id))
            .await?;

        for (index, chunk) in data.chunks(chunk_size).enumerate() {
            let kind = if index + 1 == packets {
                PacketKind::EndOfData
            } else {
                PacketKind::Data
            };
            let packet = Packet::new(self.session.address(), kind, Bytes::copy_from_slice(chunk));
            exchange::send_packet(&mut **link, &self.session, &packet).await?;
        }

        debug!("Downloaded {} bytes in {} packets", data.len(), packets);
        Ok(())
    }

    /// Read the module's information page
    pub async fn read_info_page(&self) -> Result<Bytes> {
        let mut link = self.link.lock().await;
        self.round_trip(&mut **link, Command::ReadInfPage, &[]).await?;
        self.read_data(&mut **link).await
    }

    // Composite flows

    /// Start AutoEnroll and return its stage stream
    pub async fn stream_auto_enroll(
        &self,
        template_id: u16,
        times: u8,
        flags: EnrollFlags,
    ) -> Result<StageStream<'_>> {
        let block = params::auto_enroll(template_id, times, flags);
        self.start_stream(Command::AutoEnroll, Flow::Enroll, &block).await
    }

    /// Start AutoIdentify against the whole library
    pub async fn stream_auto_identify(
        &self,
        level: u8,
        flags: IdentifyFlags,
    ) -> Result<StageStream<'_>> {
        self.stream_auto_identify_page(level, SEARCH_ALL, flags).await
    }

    /// Start AutoIdentify against one template id
    pub async fn stream_auto_identify_page(
        &self,
        level: u8,
        template_id: u16,
        flags: IdentifyFlags,
    ) -> Result<StageStream<'_>> {
        let block = params::auto_identify(level, template_id, flags);
        self.start_stream(Command::AutoIdentify, Flow::Identify, &block).await
    }

    /// Run AutoEnroll to the end
    pub async fn auto_enroll(
        &self,
        template_id: u16,
        times: u8,
        flags: EnrollFlags,
    ) -> Result<StageReport> {
        let stream = self.stream_auto_enroll(template_id, times, flags).await?;
        Ok(stream.finish().await)
    }

    /// Run AutoIdentify against the whole library to the end
    pub async fn auto_identify(&self, level: u8, flags: IdentifyFlags) -> Result<StageReport> {
        let stream = self.stream_auto_identify(level, flags).await?;
        Ok(stream.finish().await)
    }

    // Helper methods

    fn timeout_for(&self, command: Command) -> Duration {
        if command.is_capture() {
            self.capture_timeout
        } else {
            self.command_timeout
        }
    }

    async fn round_trip(
        &self,
        link: &mut dyn Transport,
        command: Command,
        params: &[u8],
    ) -> Result<Reply> {
        exchange::dispatch(link, &self.session, command, params).await?;

        let packet = exchange::receive(link, &self.session, self.timeout_for(command)).await?;
        let code = exchange::confirm(&self.session, command, &packet)?;

        if !code.is_success() {
            self.session.transition(ExchangeState::Failure)?;
            debug!(%command, "Sensor reported {}", code);
            return Err(Error::SensorFailure { command, code });
        }

        let answer_length = command.spec().answer_length;
        if packet.length() < answer_length {
            self.session.transition(ExchangeState::ProtocolError)?;
            return Err(Error::ShortResponse {
                command,
                expected: answer_length,
                actual: packet.length(),
            });
        }

        self.session.transition(ExchangeState::Success)?;
        debug!(%command, "OK");

        Ok(Reply {
            command,
            params: packet.params(),
        })
    }

    /// Collect Data packets up to and including EndOfData
    async fn read_data(&self, link: &mut dyn Transport) -> Result<Bytes> {
        let mut data = BytesMut::new();

        for _ in 0..MAX_DATA_PACKETS {
            let packet = exchange::receive(link, &self.session, self.command_timeout).await?;

            let checked = match packet.kind {
                PacketKind::Data | PacketKind::EndOfData => {
                    exchange::check_address(&self.session, &packet)
                }
                other => Err(Error::UnexpectedPacket {
                    expected: PacketKind::Data,
                    actual: other,
                }),
            };
            if let Err(e) = checked {
                warn!("Data phase broken: {}", e);
                self.session.mark_unsettled();
                self.session.transition(ExchangeState::ProtocolError)?;
                return Err(e);
            }

            data.extend_from_slice(&packet.payload);

            if packet.kind == PacketKind::EndOfData {
                self.session.transition(ExchangeState::Success)?;
                debug!("Received {} data bytes", data.len());
                return Ok(data.freeze());
            }
        }

        self.session.mark_unsettled();
        self.session.transition(ExchangeState::ProtocolError)?;
        Err(Error::DataOverrun {
            limit: MAX_DATA_PACKETS,
        })
    }

    async fn start_stream(
        &self,
        command: Command,
        flow: Flow,
        params: &[u8],
    ) -> Result<StageStream<'_>> {
        let mut link = self.link.lock().await;
        exchange::dispatch(&mut **link, &self.session, command, params).await?;

        info!(%command, "Flow started");

        Ok(StageStream::new(
            link,
            &self.session,
            command,
            flow,
            self.stage_timeout,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_create() {
        let driver = Driver::tcp("192.168.1.50", 4001);
        assert_eq!(driver.endpoint(), "192.168.1.50:4001");
        assert_eq!(driver.state(), ExchangeState::Idle);
        assert!(driver.session().is_broadcast());
    }

    #[test]
    fn test_driver_builders() {
        let driver = Driver::serial("/dev/ttyUSB0", 57_600)
            .with_address(0x0000_0001)
            .with_command_timeout(Duration::from_millis(200))
            .with_max_payload(256)
            .unwrap();

        assert_eq!(driver.session().address(), 1);
        assert_eq!(driver.session().max_payload(), 256);
        assert_eq!(driver.timeout_for(Command::Match), Duration::from_millis(200));
        assert_eq!(
            driver.timeout_for(Command::GetImage),
            Duration::from_millis(DEFAULT_CAPTURE_TIMEOUT_MS)
        );

        assert!(Driver::tcp("localhost", 4001).with_max_payload(100).is_err());
    }

    #[tokio::test]
    async fn test_composite_rejected_by_execute() {
        let driver = Driver::tcp("localhost", 4001);

        let result = driver.execute("AutoEnroll", &[0, 1, 4, 0, 0]).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = driver.execute("UpChar", &[1]).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = driver.execute("Unlock", &[]).await;
        assert!(matches!(
            result,
            Err(Error::Core(fpm383_core::Error::UnknownCommand(_)))
        ));
    }
}
