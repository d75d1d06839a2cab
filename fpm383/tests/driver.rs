mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{BROADCAST, ScriptedTransport, data, response, response_from};
use fpm383::{
    Command, ConfirmationCode, Driver, Error, ExchangeState, PacketKind, SearchHit,
};

const GET_IMAGE: [u8; 12] = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05];
const GET_IMAGE_OK: [u8; 12] = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x03, 0x00, 0x00, 0x0A];

async fn connected() -> (Driver, ScriptedTransport) {
    let module = ScriptedTransport::new();
    let driver = Driver::open(module.clone());
    driver.connect().await.unwrap();
    (driver, module)
}

#[tokio::test]
async fn test_get_image_success() {
    let (driver, module) = connected().await;
    module.push(GET_IMAGE_OK);

    driver.get_image().await.unwrap();

    assert_eq!(module.written(), vec![GET_IMAGE.to_vec()]);
    assert_eq!(driver.state(), ExchangeState::Success);
}

#[tokio::test]
async fn test_execute_by_name() {
    let (driver, module) = connected().await;
    module.push(GET_IMAGE_OK);

    let reply = driver.execute("GetImage", &[]).await.unwrap();

    assert_eq!(reply.command, Command::GetImage);
    assert!(reply.params.is_empty());
}

#[tokio::test]
async fn test_no_finger_is_sensor_failure() {
    let (driver, module) = connected().await;
    module.push(response(0x02, &[]));

    let err = driver.get_image().await.unwrap_err();

    assert!(matches!(
        err,
        Error::SensorFailure {
            command: Command::GetImage,
            code: ConfirmationCode::NoFinger,
        }
    ));
    assert!(err.to_string().contains("No finger on sensor"));
    assert!(err.is_recoverable());
    assert_eq!(driver.state(), ExchangeState::Failure);
}

#[tokio::test]
async fn test_undocumented_code_for_command() {
    let (driver, module) = connected().await;
    // Registered code, but GetImage never returns it
    module.push(response(0x0B, &[]));

    let err = driver.get_image().await.unwrap_err();

    assert!(matches!(
        err,
        Error::UnexpectedCode {
            command: Command::GetImage,
            code: 0x0B,
        }
    ));
    assert!(err.is_protocol_error());
    assert_eq!(driver.state(), ExchangeState::ProtocolError);
}

#[tokio::test]
async fn test_unregistered_code() {
    let (driver, module) = connected().await;
    module.push(response(0x40, &[]));

    let err = driver.get_image().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Core(fpm383_core::Error::UnknownCode(0x40))
    ));
}

#[tokio::test]
async fn test_checksum_corruption_then_recovery() {
    let (driver, module) = connected().await;

    let mut corrupted = GET_IMAGE_OK.to_vec();
    corrupted[11] ^= 0x01;
    module.push(corrupted);
    module.respond(GET_IMAGE_OK);

    let err = driver.get_image().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Core(fpm383_core::Error::ChecksumMismatch {
            expected: 0x000A,
            received: 0x000B,
        })
    ));
    assert_eq!(driver.state(), ExchangeState::ProtocolError);

    // The link is left ready for the next command
    driver.get_image().await.unwrap();
    assert_eq!(driver.state(), ExchangeState::Success);
}

#[tokio::test]
async fn test_bad_header() {
    let (driver, module) = connected().await;

    let mut packet = GET_IMAGE_OK.to_vec();
    packet[0] = 0xEE;
    module.push(packet);

    let err = driver.get_image().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Core(fpm383_core::Error::BadHeader { found: 0xEE01 })
    ));
    assert!(err.is_protocol_error());
}

#[tokio::test]
async fn test_silence_is_timeout() {
    let (driver, _module) = connected().await;

    let err = driver.get_image().await.unwrap_err();

    assert!(matches!(err, Error::Timeout { millis: 3000 }));
    assert!(err.is_recoverable());
    assert_eq!(driver.state(), ExchangeState::Timeout);
}

#[tokio::test]
async fn test_late_answer_not_taken_for_next_command() {
    let (driver, module) = connected().await;

    let err = driver.get_image().await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert!(driver.session().is_unsettled());

    // The first GetImage answer shows up after its deadline
    module.push(GET_IMAGE_OK);
    module.respond(response(0x02, &[]));

    let err = driver.get_image().await.unwrap_err();
    assert_eq!(err.confirmation(), Some(ConfirmationCode::NoFinger));
    assert_eq!(module.pending(), 0);
    assert!(!driver.session().is_unsettled());
}

#[tokio::test]
async fn test_declared_length_longer_than_body() {
    let (driver, module) = connected().await;
    // Length field says 10, only 6 bytes follow
    module.push([
        0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x0A, 0x00, 0x00, 0x01, 0x02, 0x00, 0x0A,
    ]);

    let err = driver.execute_command(Command::Match, &[]).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Core(fpm383_core::Error::LengthMismatch {
            declared: 10,
            actual: 6,
        })
    ));
    assert_eq!(driver.state(), ExchangeState::ProtocolError);
}

#[tokio::test]
async fn test_back_to_back_packets_in_one_burst() {
    let (driver, module) = connected().await;

    let mut burst = GET_IMAGE_OK.to_vec();
    burst.extend_from_slice(&response(0x02, &[]));
    module.push(burst);

    driver.get_image().await.unwrap();
    assert_eq!(module.pending(), 12);

    let err = driver.get_image().await.unwrap_err();
    assert_eq!(err.confirmation(), Some(ConfirmationCode::NoFinger));
}

#[tokio::test]
async fn test_parameter_length_checked_before_send() {
    let (driver, module) = connected().await;

    let err = driver.execute("GenChar", &[]).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Core(fpm383_core::Error::ParameterLength {
            command: Command::GenChar,
            expected: 1,
            actual: 0,
        })
    ));
    assert!(module.written().is_empty());
}

#[tokio::test]
async fn test_search_hit() {
    let (driver, module) = connected().await;
    module.push(response(0x00, &[0x00, 0x05, 0x00, 0x64]));

    let hit = driver.search(1, 0, 60).await.unwrap();

    assert_eq!(hit, SearchHit { page_id: 5, score: 100 });
    assert_eq!(
        module.written()[0][9..14].to_vec(),
        vec![0x04, 0x01, 0x00, 0x00, 0x00]
    );
}

#[tokio::test]
async fn test_search_not_found() {
    let (driver, module) = connected().await;
    module.push(response(0x09, &[0x00, 0x00, 0x00, 0x00]));

    let err = driver.search(1, 0, 60).await.unwrap_err();

    assert_eq!(err.confirmation(), Some(ConfirmationCode::NotFound));
}

#[tokio::test]
async fn test_success_without_fields_is_short() {
    let (driver, module) = connected().await;
    module.push(response(0x00, &[]));

    let err = driver.search(1, 0, 60).await.unwrap_err();

    assert!(matches!(
        err,
        Error::ShortResponse {
            command: Command::Search,
            expected: 7,
            actual: 3,
        }
    ));
}

#[tokio::test]
async fn test_match_score() {
    let (driver, module) = connected().await;
    module.push(response(0x00, &[0x01, 0x2C]));

    assert_eq!(driver.match_buffers().await.unwrap(), 300);
}

#[tokio::test]
async fn test_system_parameters_set_payload_limit() {
    let (driver, module) = connected().await;
    module.push(response(
        0x00,
        &[
            0x00, 0x04, 0x06, 0x00, 0x00, 0x3C, 0x00, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x03,
            0x00, 0x06,
        ],
    ));

    let parameters = driver.read_system_parameters().await.unwrap();

    assert_eq!(parameters.library_capacity, 60);
    assert_eq!(parameters.baud_rate(), 57_600);
    assert_eq!(driver.session().max_payload(), 256);
}

#[tokio::test]
async fn test_write_packet_size_register() {
    let (driver, module) = connected().await;
    module.push(response(0x00, &[]));

    driver.write_reg(6, 1).await.unwrap();

    assert_eq!(driver.session().max_payload(), 64);
}

#[tokio::test]
async fn test_index_table_and_count() {
    let (driver, module) = connected().await;

    let mut bitmap = [0u8; 32];
    bitmap[0] = 0b0000_0101;
    module.push(response(0x00, &bitmap));
    module.push(response(0x00, &[0x00, 0x02]));

    let table = driver.read_index_table(0).await.unwrap();
    assert_eq!(table.occupied(), vec![0, 2]);
    assert_eq!(table.first_free(), Some(1));

    assert_eq!(driver.valid_template_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_address_mismatch() {
    let module = ScriptedTransport::new();
    let driver = Driver::open(module.clone()).with_address(0x0000_0001);
    driver.connect().await.unwrap();

    module.push(response_from(BROADCAST, 0x00, &[]));

    let err = driver.get_image().await.unwrap_err();
    assert!(matches!(
        err,
        Error::AddressMismatch {
            expected: 1,
            actual: BROADCAST,
        }
    ));

    module.push(response_from(1, 0x00, &[]));
    driver.get_image().await.unwrap();
    assert_eq!(module.written()[1][2..6].to_vec(), vec![0x00, 0x00, 0x00, 0x01]);
}

#[tokio::test]
async fn test_upload_template_reassembly() {
    let (driver, module) = connected().await;
    module.push(response(0x00, &[]));
    module.push(data(PacketKind::Data, &[0x10, 0x11, 0x12]));
    module.push(data(PacketKind::Data, &[0x20, 0x21]));
    module.push(data(PacketKind::EndOfData, &[0x30]));

    let template = driver.upload_template(1).await.unwrap();

    assert_eq!(template.as_ref(), &[0x10, 0x11, 0x12, 0x20, 0x21, 0x30]);
    assert_eq!(driver.state(), ExchangeState::Success);
}

#[tokio::test]
async fn test_upload_interrupted_by_response() {
    let (driver, module) = connected().await;
    module.push(response(0x00, &[]));
    module.push(data(PacketKind::Data, &[0x10]));
    module.push(response(0x00, &[]));

    let err = driver.upload_template(1).await.unwrap_err();

    assert!(matches!(
        err,
        Error::UnexpectedPacket {
            expected: PacketKind::Data,
            actual: PacketKind::Response,
        }
    ));

    // Rest of the interrupted transfer is dropped before the next request
    module.push(data(PacketKind::EndOfData, &[0x11]));
    module.respond(GET_IMAGE_OK);
    driver.get_image().await.unwrap();
    assert_eq!(module.pending(), 0);
}

#[tokio::test]
async fn test_upload_refused() {
    let (driver, module) = connected().await;
    module.push(response(0x0D, &[]));

    let err = driver.upload_template(1).await.unwrap_err();

    assert_eq!(err.confirmation(), Some(ConfirmationCode::FeatureUploadFailed));
    assert_eq!(module.pending(), 0);
}

#[tokio::test]
async fn test_download_template_chunking() {
    let (driver, module) = connected().await;
    module.push(response(0x00, &[]));

    let template: Vec<u8> = (0..300u16).map(|i| i as u8).collect();
    driver.download_template(2, &template).await.unwrap();

    let written = module.written();
    assert_eq!(written.len(), 4);

    // DownChar(buffer 2)
    assert_eq!(written[0][6..10].to_vec(), vec![0x01, 0x00, 0x04, 0x09]);

    let kinds: Vec<u8> = written[1..].iter().map(|w| w[6]).collect();
    assert_eq!(kinds, vec![0x02, 0x02, 0x08]);

    let sizes: Vec<usize> = written[1..].iter().map(|w| w.len() - 11).collect();
    assert_eq!(sizes, vec![128, 128, 44]);

    let reassembled: Vec<u8> = written[1..]
        .iter()
        .flat_map(|w| w[9..w.len() - 2].to_vec())
        .collect();
    assert_eq!(reassembled, template);
}

#[tokio::test]
async fn test_download_empty_template() {
    let (driver, module) = connected().await;

    let err = driver.download_template(1, &[]).await.unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(module.written().is_empty());
}

#[tokio::test]
async fn test_read_info_page() {
    let (driver, module) = connected().await;
    module.push(response(0x00, &[]));
    module.push(data(PacketKind::EndOfData, b"FPM383C"));

    let page = driver.read_info_page().await.unwrap();

    assert_eq!(page.as_ref(), b"FPM383C");
}

#[tokio::test]
async fn test_wait_ready() {
    let (driver, module) = connected().await;
    module.push([0x55]);

    assert!(driver.wait_ready(Duration::from_millis(100)).await.unwrap());
    assert!(!driver.wait_ready(Duration::from_millis(100)).await.unwrap());
}

#[tokio::test]
async fn test_not_connected() {
    let module = ScriptedTransport::new();
    let driver = Driver::open(module);

    let err = driver.get_image().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(fpm383_transport::Error::NotConnected)
    ));
    assert_eq!(driver.state(), ExchangeState::Idle);
}

#[tokio::test]
async fn test_disconnect() {
    let (driver, _module) = connected().await;
    assert!(driver.is_connected().await);

    driver.disconnect().await.unwrap();
    assert!(!driver.is_connected().await);
}
