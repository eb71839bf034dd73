//! WhatsApp JID address resolution.
//!
//! Group deliveries arrive with a compound sender of the form
//! `"<device-jid> in <group-jid>"`. Replies go to the group; media
//! downloads need the bare phone JID of the sending device.

const USER_DOMAIN: &str = "@s.whatsapp.net";
const GROUP_SEPARATOR: &str = " in ";

/// Where a reply to this sender should be routed.
///
/// For compound senders the destination is the chat portion after `" in "`;
/// everything else is returned unchanged.
pub fn reply_destination(sender_jid: &str) -> String {
    match sender_jid.split_once(GROUP_SEPARATOR) {
        Some((_, chat)) => chat.to_string(),
        None => sender_jid.to_string(),
    }
}

/// The phone JID to pass to the bridge's media download API.
///
/// Compound senders use the portion after `" in "`. Otherwise the device
/// suffix between `:` and `@` is stripped (`6281:12@s...` → `6281@s...`).
/// The result always carries the `@s.whatsapp.net` domain.
pub fn download_phone(sender_jid: &str) -> String {
    let base = match sender_jid.split_once(GROUP_SEPARATOR) {
        Some((_, chat)) => chat.to_string(),
        None => match (sender_jid.find(':'), sender_jid.find('@')) {
            (Some(colon), Some(at)) if colon < at => {
                format!("{}{}", &sender_jid[..colon], &sender_jid[at..])
            }
            _ => sender_jid.to_string(),
        },
    };

    if base.contains('@') {
        base
    } else {
        format!("{base}{USER_DOMAIN}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_destination_group() {
        assert_eq!(
            reply_destination("62811@s.whatsapp.net in 62822@g.us"),
            "62822@g.us"
        );
    }

    #[test]
    fn test_reply_destination_direct() {
        assert_eq!(
            reply_destination("62811@s.whatsapp.net"),
            "62811@s.whatsapp.net"
        );
    }

    #[test]
    fn test_download_phone_group_uses_chat_portion() {
        assert_eq!(
            download_phone("62811@s.whatsapp.net in 62822@g.us"),
            "62822@g.us"
        );
    }

    #[test]
    fn test_download_phone_strips_device_suffix() {
        assert_eq!(
            download_phone("62811:74@s.whatsapp.net"),
            "62811@s.whatsapp.net"
        );
    }

    #[test]
    fn test_download_phone_adds_domain() {
        assert_eq!(download_phone("62811"), "62811@s.whatsapp.net");
    }

    #[test]
    fn test_download_phone_plain_jid_unchanged() {
        assert_eq!(
            download_phone("62811@s.whatsapp.net"),
            "62811@s.whatsapp.net"
        );
    }
}
