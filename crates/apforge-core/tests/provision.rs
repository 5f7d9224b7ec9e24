use std::fs;
use std::path::Path;

use apforge_core::{
    MacAddress, ProvisionConfig, ProvisionError, Provisioner, RadioProbe, Result,
};
use tempfile::TempDir;

const IW_LIST: &str = "Wiphy phy0\n\tmax # scan SSIDs: 4\n";

const PHY_INFO: &str = "Wiphy phy0\n\
    \tBand 1:\n\
    \t\tCapabilities: 0x17e\n\
    \t\t\tHT20/HT40\n\
    \t\t\tRX HT20 SGI\n\
    \t\t\tRX HT40 SGI\n\
    \t\t\tTX STBC\n\
    \t\t\tRX STBC 1-stream\n\
    \t\t\tDSSS/CCK HT40\n\
    \t\tFrequencies:\n\
    \t\t\t* 2412 MHz [1] (20.0 dBm)\n";

/// Stands in for a Raspberry Pi with one USB radio.
struct FixtureProbe {
    with_mac: bool,
}

impl RadioProbe for FixtureProbe {
    fn phy_list(&self) -> Result<String> {
        Ok(IW_LIST.to_string())
    }

    fn phy_info(&self, phy: &str) -> Result<String> {
        assert_eq!(phy, "phy0");
        Ok(PHY_INFO.to_string())
    }

    fn wireless_interfaces(&self) -> Result<Vec<String>> {
        Ok(vec!["wlan0".to_string()])
    }

    fn mac_address(&self, interface: &str) -> Result<MacAddress> {
        if self.with_mac && interface == "wlan0" {
            "00:0e:8e:64:2a:00".parse()
        } else {
            Err(ProvisionError::probe(interface, "no such device"))
        }
    }

    fn hostname(&self) -> Result<String> {
        Ok("pfannkuchenpfanne".to_string())
    }
}

fn config(root: &Path) -> ProvisionConfig {
    ProvisionConfig {
        config_dir: root.join("wifi"),
        hostapd_conf: root.join("etc/hostapd/hostapd.conf"),
        dnsmasq_dir: root.join("etc/dnsmasq.d"),
        nodename_file: root.join("nodename"),
        state_root: root.join("state"),
        ..ProvisionConfig::default()
    }
}

fn enable(dir: &Path, password: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("enabled"), "").unwrap();
    fs::write(dir.join("password"), format!("{password}\n")).unwrap();
}

const EXPECTED_HOSTAPD: &str = "ctrl_interface=/var/run/hostapd\n\
    driver=nl80211\n\
    hw_mode=g\n\
    ieee80211n=1\n\
    ieee80211d=1\n\
    country_code=US\n\
    wme_enabled=1\n\
    wmm_enabled=1\n\
    channel=6\n\
    ht_capab=[HT20][HT40+][SHORT-GI-20][SHORT-GI-40][DSSS_CCK-40][TX-STBC][RX-STBC1]\n\
    interface=wlan0\n\
    ssid=pfannkuchenpfanne\n\
    macaddr_acl=0\n\
    auth_algs=1\n\
    ignore_broadcast_ssid=0\n\
    wpa=2\n\
    wpa_key_mgmt=WPA-PSK\n\
    rsn_pairwise=CCMP\n\
    wpa_psk=5eb4f89bf08336deffb335fd755875795ea581df4ca2ea7265bfa9d57420c504\n\
    bss=wlan1\n\
    bssid=02:0e:8e:64:2a:01\n\
    ssid=pfannkuchenpfanne (public)\n\
    macaddr_acl=0\n\
    auth_algs=1\n\
    ignore_broadcast_ssid=0\n\
    wpa=2\n\
    wpa_key_mgmt=WPA-PSK\n\
    rsn_pairwise=CCMP\n\
    wpa_psk=1acef0cc5919074b752b465900f9d882871cfbbd60ef5fe37357dd9a15d81a3e\n";

#[test]
fn provisions_private_and_guest_networks() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path());
    enable(&cfg.config_dir, "secretprivate");
    enable(&cfg.config_dir.join("guest"), "secretpublic");
    fs::write(cfg.channel_file(), "6\n").unwrap();
    let probe = FixtureProbe { with_mac: true };

    let outcome = Provisioner::new(&cfg, &probe).provision(false).unwrap();
    assert_eq!(outcome.written.len(), 3);

    let hostapd = fs::read_to_string(&cfg.hostapd_conf).unwrap();
    assert_eq!(hostapd, EXPECTED_HOSTAPD);

    let private = fs::read_to_string(cfg.dnsmasq_conf("private")).unwrap();
    assert_eq!(
        private,
        "interface=wlan0\n\
         address=/pfannkuchenpfanne/10.42.0.1\n\
         dhcp-range=wlan0,10.42.0.10,10.42.255.250,24h\n\
         dhcp-option=3,10.42.0.1\n\
         dhcp-option=6,10.42.0.1\n\
         dhcp-option=19,0\n\
         dhcp-option=20,0\n\
         dhcp-option=44,0.0.0.0\n\
         dhcp-option=45,0.0.0.0\n\
         dhcp-option=46,8\n\
         dhcp-option=47\n\
         dhcp-authoritative\n\
         bind-interfaces\n\
         except-interface=lo\n"
    );

    let public = fs::read_to_string(cfg.dnsmasq_conf("public")).unwrap();
    assert!(public.starts_with("interface=wlan1\naddress=/pfannkuchenpfanne/10.43.0.1\n"));
    assert!(public.contains("dhcp-range=wlan1,10.43.0.10,10.43.255.250,24h\n"));
}

#[test]
fn rerun_is_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path());
    enable(&cfg.config_dir, "secretprivate");
    enable(&cfg.config_dir.join("guest"), "secretpublic");
    let probe = FixtureProbe { with_mac: true };

    let first = Provisioner::new(&cfg, &probe).plan().unwrap().documents;
    let second = Provisioner::new(&cfg, &probe).plan().unwrap().documents;
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn guest_only_uses_primary_slot() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path());
    enable(&cfg.config_dir.join("guest"), "secretpublic");
    fs::write(&cfg.nodename_file, "cafe.example.org\n").unwrap();
    let probe = FixtureProbe { with_mac: true };

    let outcome = Provisioner::new(&cfg, &probe).provision(false).unwrap();
    let hostapd = fs::read_to_string(&cfg.hostapd_conf).unwrap();
    assert!(hostapd.contains("interface=wlan0\nssid=cafe.example.org (public)\n"));
    assert!(!hostapd.contains("bssid="));
    assert_eq!(outcome.written.len(), 2);
    assert!(!cfg.dnsmasq_conf("private").exists());

    let public = fs::read_to_string(cfg.dnsmasq_conf("public")).unwrap();
    assert!(public.contains("address=/cafe/10.42.0.1\n"));
}

#[test]
fn missing_mac_uses_placeholder_bssid() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path());
    enable(&cfg.config_dir, "secretprivate");
    enable(&cfg.config_dir.join("guest"), "secretpublic");
    let probe = FixtureProbe { with_mac: false };

    let outcome = Provisioner::new(&cfg, &probe).provision(true).unwrap();
    assert!(outcome.written.is_empty());
    assert!(!cfg.hostapd_conf.exists());

    let docs = outcome.documents.unwrap();
    assert!(docs.hostapd.contains("bssid=02:00:b0:0b:00:01\n"));
    assert!(docs.hostapd.contains("channel=1\n"));
}

#[test]
fn open_guest_network_has_no_psk() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path());
    enable(&cfg.config_dir, "secretprivate");
    let guest = cfg.config_dir.join("guest");
    fs::create_dir_all(&guest).unwrap();
    fs::write(guest.join("enabled"), "").unwrap();
    let probe = FixtureProbe { with_mac: true };

    let docs = Provisioner::new(&cfg, &probe)
        .plan()
        .unwrap()
        .documents
        .unwrap();
    assert_eq!(docs.hostapd.matches("wpa_psk=").count(), 1);
    assert!(docs
        .hostapd
        .ends_with("bssid=02:0e:8e:64:2a:01\nssid=pfannkuchenpfanne (public)\n"));
}

#[test]
fn exhausted_address_space_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(tmp.path());
    cfg.network.base_subnet = "255.255.255.0/24".parse().unwrap();
    enable(&cfg.config_dir, "secretprivate");
    enable(&cfg.config_dir.join("guest"), "secretpublic");
    let probe = FixtureProbe { with_mac: true };

    let err = Provisioner::new(&cfg, &probe).provision(false).unwrap_err();
    assert!(matches!(err, ProvisionError::AddressSpaceExhausted { .. }));
    assert!(!cfg.hostapd_conf.exists());
    assert!(!cfg.dnsmasq_conf("private").exists());
}
