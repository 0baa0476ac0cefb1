//! Value-to-name tables for log lines and diagnostics, plus small helpers
//! shared across modules.

pub mod ring;
pub mod time;

const AEM_COMMAND_NAMES: &[&str] = &[
    "ACQUIRE_ENTITY",
    "LOCK_ENTITY",
    "ENTITY_AVAILABLE",
    "CONTROLLER_AVAILABLE",
    "READ_DESCRIPTOR",
    "WRITE_DESCRIPTOR",
    "SET_CONFIGURATION",
    "GET_CONFIGURATION",
    "SET_STREAM_FORMAT",
    "GET_STREAM_FORMAT",
    "SET_VIDEO_FORMAT",
    "GET_VIDEO_FORMAT",
    "SET_SENSOR_FORMAT",
    "GET_SENSOR_FORMAT",
    "SET_STREAM_INFO",
    "GET_STREAM_INFO",
    "SET_NAME",
    "GET_NAME",
    "SET_ASSOCIATION_ID",
    "GET_ASSOCIATION_ID",
    "SET_SAMPLING_RATE",
    "GET_SAMPLING_RATE",
    "SET_CLOCK_SOURCE",
    "GET_CLOCK_SOURCE",
    "SET_CONTROL",
    "GET_CONTROL",
    "INCREMENT_CONTROL",
    "DECREMENT_CONTROL",
    "SET_SIGNAL_SELECTOR",
    "GET_SIGNAL_SELECTOR",
    "SET_MIXER",
    "GET_MIXER",
    "SET_MATRIX",
    "GET_MATRIX",
    "START_STREAMING",
    "STOP_STREAMING",
    "REGISTER_UNSOLICITED_NOTIFICATION",
    "DEREGISTER_UNSOLICITED_NOTIFICATION",
    "IDENTIFY_NOTIFICATION",
    "GET_AVB_INFO",
    "GET_AS_PATH",
    "GET_COUNTERS",
    "REBOOT",
    "GET_AUDIO_MAP",
    "ADD_AUDIO_MAPPINGS",
    "REMOVE_AUDIO_MAPPINGS",
];

const DESCRIPTOR_NAMES: &[&str] = &[
    "ENTITY",
    "CONFIGURATION",
    "AUDIO_UNIT",
    "VIDEO_UNIT",
    "SENSOR_UNIT",
    "STREAM_INPUT",
    "STREAM_OUTPUT",
    "JACK_INPUT",
    "JACK_OUTPUT",
    "AVB_INTERFACE",
    "CLOCK_SOURCE",
    "MEMORY_OBJECT",
    "LOCALE",
    "STRINGS",
    "STREAM_PORT_INPUT",
    "STREAM_PORT_OUTPUT",
    "EXTERNAL_PORT_INPUT",
    "EXTERNAL_PORT_OUTPUT",
    "INTERNAL_PORT_INPUT",
    "INTERNAL_PORT_OUTPUT",
    "AUDIO_CLUSTER",
    "VIDEO_CLUSTER",
    "SENSOR_CLUSTER",
    "AUDIO_MAP",
    "VIDEO_MAP",
    "SENSOR_MAP",
    "CONTROL",
    "SIGNAL_SELECTOR",
    "MIXER",
    "MATRIX",
    "MATRIX_SIGNAL",
    "SIGNAL_SPLITTER",
    "SIGNAL_COMBINER",
    "SIGNAL_DEMULTIPLEXER",
    "SIGNAL_MULTIPLEXER",
    "SIGNAL_TRANSCODER",
    "CLOCK_DOMAIN",
    "CONTROL_BLOCK",
];

const AEM_STATUS_NAMES: &[&str] = &[
    "SUCCESS",
    "NOT_IMPLEMENTED",
    "NO_SUCH_DESCRIPTOR",
    "ENTITY_LOCKED",
    "ENTITY_ACQUIRED",
    "NOT_AUTHENTICATED",
    "AUTHENTICATION_DISABLED",
    "BAD_ARGUMENTS",
    "NO_RESOURCES",
    "IN_PROGRESS",
    "ENTITY_MISBEHAVING",
    "NOT_SUPPORTED",
    "STREAM_IS_RUNNING",
];

const ACMP_STATUS_NAMES: &[&str] = &[
    "SUCCESS",
    "LISTENER_UNKNOWN_ID",
    "TALKER_UNKNOWN_ID",
    "TALKER_DEST_MAC_FAIL",
    "TALKER_NO_STREAM_INDEX",
    "TALKER_NO_BANDWIDTH",
    "TALKER_EXCLUSIVE",
    "LISTENER_TALKER_TIMEOUT",
    "LISTENER_EXCLUSIVE",
    "STATE_UNAVAILABLE",
    "NOT_CONNECTED",
    "NO_SUCH_CONNECTION",
    "COULD_NOT_SEND_MESSAGE",
    "TALKER_MISBEHAVING",
    "LISTENER_MISBEHAVING",
    "RESERVED",
    "CONTROLLER_NOT_AUTHORIZED",
    "INCOMPATIBLE_REQUEST",
];

/// IEC 61883-6 AM824 MBLA formats seen on audio end stations.
const IEEE1722_FORMATS: &[(u64, &str)] = &[
    (0x00A0_0201_4000_0100, "IEC61883_AM824_MBLA_48KHZ_1CH"),
    (0x00A0_0202_4000_0200, "IEC61883_AM824_MBLA_48KHZ_2CH"),
    (0x00A0_0204_4000_0400, "IEC61883_AM824_MBLA_48KHZ_4CH"),
    (0x00A0_0208_4000_0800, "IEC61883_AM824_MBLA_48KHZ_8CH"),
    (0x00A0_0401_4000_0100, "IEC61883_AM824_MBLA_96KHZ_1CH"),
    (0x00A0_0402_4000_0200, "IEC61883_AM824_MBLA_96KHZ_2CH"),
    (0x00A0_0404_4000_0400, "IEC61883_AM824_MBLA_96KHZ_4CH"),
    (0x00A0_0408_4000_0800, "IEC61883_AM824_MBLA_96KHZ_8CH"),
];

pub fn aem_command_name(command_type: u16) -> &'static str {
    AEM_COMMAND_NAMES
        .get(command_type as usize)
        .copied()
        .unwrap_or("UNKNOWN")
}

pub fn descriptor_name(descriptor_type: u16) -> &'static str {
    DESCRIPTOR_NAMES
        .get(descriptor_type as usize)
        .copied()
        .unwrap_or("UNKNOWN")
}

pub fn aem_status_name(status: u8) -> &'static str {
    AEM_STATUS_NAMES
        .get(status as usize)
        .copied()
        .unwrap_or("UNKNOWN")
}

pub fn acmp_status_name(status: u8) -> &'static str {
    if status == crate::message::acmp::ACMP_STATUS_NOT_SUPPORTED {
        return "NOT_SUPPORTED";
    }
    ACMP_STATUS_NAMES
        .get(status as usize)
        .copied()
        .unwrap_or("UNKNOWN")
}

/// Symbolic name for an IEEE 1722 stream format code.
pub fn ieee1722_format_name(format: u64) -> &'static str {
    IEEE1722_FORMATS
        .iter()
        .find(|(value, _)| *value == format)
        .map(|(_, name)| *name)
        .unwrap_or("UNKNOWN")
}

/// Stream format code for a symbolic name, if the table knows it.
pub fn ieee1722_format_value(name: &str) -> Option<u64> {
    IEEE1722_FORMATS
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(value, _)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_and_descriptor_names() {
        assert_eq!(aem_command_name(0x0004), "READ_DESCRIPTOR");
        assert_eq!(aem_command_name(0x7000), "UNKNOWN");
        assert_eq!(descriptor_name(0x0005), "STREAM_INPUT");
        assert_eq!(descriptor_name(0x0024), "CLOCK_DOMAIN");
    }

    #[test]
    fn format_table_round_trips() {
        let name = ieee1722_format_name(0x00A0_0202_4000_0200);
        assert_eq!(name, "IEC61883_AM824_MBLA_48KHZ_2CH");
        assert_eq!(ieee1722_format_value(name), Some(0x00A0_0202_4000_0200));
        assert_eq!(ieee1722_format_name(0xDEAD_BEEF), "UNKNOWN");
    }
}
