//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Tables:
//  Built-in option spaces and option definitions.
//

use crate::registry::{RegistryBuilder, SpaceSpec};
use crate::universe::SpaceKind;

/// (name, format, code)
pub type OptionTable = &'static [(&'static str, &'static str, u32)];

pub const DHCP_OPTIONS: OptionTable = &[
    ("subnet-mask", "I", 1),
    ("time-offset", "l", 2),
    ("routers", "IA", 3),
    ("time-servers", "IA", 4),
    ("ien116-name-servers", "IA", 5),
    ("domain-name-servers", "IA", 6),
    ("log-servers", "IA", 7),
    ("cookie-servers", "IA", 8),
    ("lpr-servers", "IA", 9),
    ("impress-servers", "IA", 10),
    ("resource-location-servers", "IA", 11),
    ("host-name", "t", 12),
    ("boot-size", "S", 13),
    ("merit-dump", "t", 14),
    ("domain-name", "t", 15),
    ("swap-server", "I", 16),
    ("root-path", "t", 17),
    ("extensions-path", "t", 18),
    ("ip-forwarding", "f", 19),
    ("non-local-source-routing", "f", 20),
    ("policy-filter", "IIA", 21),
    ("max-dgram-reassembly", "S", 22),
    ("default-ip-ttl", "B", 23),
    ("path-mtu-aging-timeout", "L", 24),
    ("path-mtu-plateau-table", "SA", 25),
    ("interface-mtu", "S", 26),
    ("all-subnets-local", "f", 27),
    ("broadcast-address", "I", 28),
    ("perform-mask-discovery", "f", 29),
    ("mask-supplier", "f", 30),
    ("router-discovery", "f", 31),
    ("router-solicitation-address", "I", 32),
    ("static-routes", "IIA", 33),
    ("trailer-encapsulation", "f", 34),
    ("arp-cache-timeout", "L", 35),
    ("ieee802-3-encapsulation", "f", 36),
    ("default-tcp-ttl", "B", 37),
    ("tcp-keepalive-interval", "L", 38),
    ("tcp-keepalive-garbage", "f", 39),
    ("nis-domain", "t", 40),
    ("nis-servers", "IA", 41),
    ("ntp-servers", "IA", 42),
    ("vendor-encapsulated-options", "E.", 43),
    ("netbios-name-servers", "IA", 44),
    ("netbios-dd-server", "IA", 45),
    ("netbios-node-type", "B", 46),
    ("netbios-scope", "t", 47),
    ("font-servers", "IA", 48),
    ("x-display-manager", "IA", 49),
    ("dhcp-requested-address", "I", 50),
    ("dhcp-lease-time", "L", 51),
    ("dhcp-option-overload", "B", 52),
    ("dhcp-message-type", "B", 53),
    ("dhcp-server-identifier", "I", 54),
    ("dhcp-parameter-request-list", "BA", 55),
    ("dhcp-message", "t", 56),
    ("dhcp-max-message-size", "S", 57),
    ("dhcp-renewal-time", "L", 58),
    ("dhcp-rebinding-time", "L", 59),
    ("vendor-class-identifier", "X", 60),
    ("dhcp-client-identifier", "X", 61),
    ("nwip-domain", "t", 62),
    ("nwip-suboptions", "Enwip.", 63),
    ("nisplus-domain", "t", 64),
    ("nisplus-servers", "IA", 65),
    ("tftp-server-name", "t", 66),
    ("bootfile-name", "t", 67),
    ("mobile-ip-home-agent", "IA", 68),
    ("smtp-server", "IA", 69),
    ("pop-server", "IA", 70),
    ("nntp-server", "IA", 71),
    ("www-server", "IA", 72),
    ("finger-server", "IA", 73),
    ("irc-server", "IA", 74),
    ("streettalk-server", "IA", 75),
    ("streettalk-directory-assistance-server", "IA", 76),
    ("user-class", "t", 77),
    ("slp-directory-agent", "fIa", 78),
    ("slp-service-scope", "fto", 79),
    ("rapid-commit", "Z", 80),
    ("fqdn", "Efqdn.", 81),
    ("relay-agent-information", "Eagent.", 82),
    ("nds-servers", "IA", 85),
    ("nds-tree-name", "t", 86),
    ("nds-context", "t", 87),
    ("bcms-controller-names", "D", 88),
    ("bcms-controller-address", "Ia", 89),
    ("client-last-transaction-time", "L", 91),
    ("associated-ip", "Ia", 92),
    ("pxe-system-type", "S", 93),
    ("pxe-interface-id", "BBB", 94),
    ("pxe-client-id", "BX", 97),
    ("uap-servers", "t", 98),
    ("geoconf-civic", "X", 99),
    ("pcode", "t", 100),
    ("tcode", "t", 101),
    ("netinfo-server-address", "Ia", 112),
    ("netinfo-server-tag", "t", 113),
    ("default-url", "t", 114),
    ("name-service-search", "Sa", 117),
    ("subnet-selection", "I", 118),
    ("domain-search", "Dc", 119),
    ("vivco", "Evendor-class.", 124),
    ("vivso", "Evendor.", 125),
    ("pxe-undefined-1", "X", 128),
    ("pxe-undefined-2", "X", 129),
    ("pxe-undefined-3", "X", 130),
    ("pxe-undefined-4", "X", 131),
    ("pxe-undefined-5", "X", 132),
    ("pxe-undefined-6", "X", 133),
    ("pxe-undefined-7", "X", 134),
    ("pxe-undefined-8", "X", 135),
    ("rdnss-selection", "BIID", 146),
    ("tftp-server-address", "Ia", 150),
    ("pxelinux-magic", "BBBB", 208),
    ("loader-configfile", "t", 209),
    ("loader-pathprefix", "t", 210),
    ("loader-reboottime", "L", 211),
    ("option-6rd", "BB6Ia", 212),
];

pub const AGENT_OPTIONS: OptionTable = &[
    ("circuit-id", "X", 1),
    ("remote-id", "X", 2),
    ("agent-id", "I", 3),
    ("DOCSIS-device-class", "L", 4),
    ("link-selection", "I", 5),
    ("server-id-override", "I", 11),
    ("relay-port", "Z", 19),
];

pub const NWIP_OPTIONS: OptionTable = &[
    ("illegal-1", "", 1),
    ("illegal-2", "", 2),
    ("illegal-3", "", 3),
    ("illegal-4", "", 4),
    ("nsq-broadcast", "f", 5),
    ("preferred-dss", "IA", 6),
    ("nearest-nwip-server", "IA", 7),
    ("autoretries", "B", 8),
    ("autoretry-secs", "B", 9),
    ("nwip-1-1", "f", 10),
    ("primary-dss", "I", 11),
];

pub const FQDN_OPTIONS: OptionTable = &[
    ("no-client-update", "f", 1),
    ("server-update", "f", 2),
    ("encoded", "f", 3),
    ("rcode1", "B", 4),
    ("rcode2", "B", 5),
    ("hostname", "t", 6),
    ("domainname", "t", 7),
    ("fqdn", "t", 8),
];

pub const VENDOR_CLASS_OPTIONS: OptionTable = &[
    ("isc", "X", 2495),
];

pub const VENDOR_OPTIONS: OptionTable = &[
    ("isc", "Eisc.", 2495),
];

pub const ISC_OPTIONS: OptionTable = &[
    ("media", "t", 1),
    ("update-assist", "X", 2),
];

fn sub_space(name: &str, tag_size: usize, kind: SpaceKind, parent: (&str, u32)) -> SpaceSpec {
    SpaceSpec {
        name: name.to_string(),
        tag_size,
        length_size: 1,
        pad: None,
        end: 0,
        concat_duplicates: false,
        kind,
        parent: Some((parent.0.to_string(), parent.1)),
    }
}

/// Register the built-in spaces and their options.
pub fn load_standard(builder: RegistryBuilder) -> RegistryBuilder {
    let spaces: [(SpaceSpec, OptionTable); 7] = [
        (SpaceSpec {
            name: "dhcp".to_string(),
            tag_size: 1,
            length_size: 1,
            pad: Some(0),
            end: 255,
            concat_duplicates: true,
            kind: SpaceKind::Hashed,
            parent: None,
        }, DHCP_OPTIONS),
        (sub_space("agent", 1, SpaceKind::Linked, ("dhcp", 82)), AGENT_OPTIONS),
        (sub_space("nwip", 1, SpaceKind::Nwip, ("dhcp", 63)), NWIP_OPTIONS),
        (sub_space("fqdn", 1, SpaceKind::Fqdn, ("dhcp", 81)), FQDN_OPTIONS),
        (sub_space("vendor-class", 4, SpaceKind::Hashed, ("dhcp", 124)), VENDOR_CLASS_OPTIONS),
        (sub_space("vendor", 4, SpaceKind::Hashed, ("dhcp", 125)), VENDOR_OPTIONS),
        (SpaceSpec {
            length_size: 2,
            ..sub_space("isc", 2, SpaceKind::Linked, ("vendor", 2495))
        }, ISC_OPTIONS),
    ];

    let mut builder = builder;
    for (space, options) in spaces {
        let name = space.name.clone();
        builder = builder.space(space);
        for (option, format, code) in options {
            builder = builder.option(&name, option, *code, format);
        }
    }
    builder
}
