//! Packages that were JDK internal API before modules and were removed.
//!
//! A target in one of these packages resolves to the
//! "JDK removed internal API" sentinel archive instead of "not found".

use once_cell::sync::Lazy;
use std::collections::BTreeSet;

const REMOVED_PACKAGES: &[&str] = &[
    "com.sun.image.codec.jpeg",
    "sun.awt.image.codec",
    "com.sun.jmx.snmp",
    "com.sun.jmx.snmp.agent",
    "com.sun.jmx.snmp.daemon",
    "com.sun.jmx.snmp.defaults",
    "com.sun.jmx.snmp.IPAcl",
    "com.sun.jmx.snmp.internal",
    "com.sun.jmx.snmp.mpm",
    "com.sun.jmx.snmp.tasks",
    "sun.management.snmp",
    "sun.management.snmp.jvminstr",
    "sun.management.snmp.jvmmib",
    "sun.management.snmp.util",
    "com.sun.tracing",
    "com.sun.tracing.dtrace",
    "sun.tracing",
    "sun.tracing.dtrace",
    "com.sun.java.browser.dom",
    "com.sun.java.browser.net",
];

static REMOVED: Lazy<BTreeSet<String>> =
    Lazy::new(|| REMOVED_PACKAGES.iter().map(|p| p.to_string()).collect());

pub fn removed_packages() -> &'static BTreeSet<String> {
    &REMOVED
}

pub fn is_removed_package(pn: &str) -> bool {
    REMOVED.contains(pn)
}
