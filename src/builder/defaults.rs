// Built-in default programs for the authoring modes

/// Default script-mode program shown to a new user (and restored by migration)
pub fn default_javascript_code() -> String {
    r#"// Script simulator
// Available functions: set(channel, state), await sleep(ms), off(), on()
// Available variables: totalChannels, delayTime, pin_size_, pin_ptr_[], halfSize

// Simple blink pattern example:
for (let i = 0; i < 5; i++) {
    on();               // Turn all channels ON
    await sleep(30);    // Wait 30ms
    off();              // Turn all channels OFF
    await sleep(30);    // Wait 30ms
}

// Custom pattern - modify this code:
for (let i = 0; i < pin_size_; i++) {
    set(pin_ptr_[i], true);     // Turn channel ON
    await sleep(delayTime);     // Use configured delay
    set(pin_ptr_[i], false);    // Turn channel OFF
}
"#
    .to_string()
}

/// Default firmware-style sequence for the C++ authoring mode
pub fn default_cpp_code() -> String {
    r#"void BaseChannel::taskSequenceAdvanced() {
    for (int i = 0; i < config_data_ptr_->header.pin_size_; i++) {
        set(config_data_ptr_->header.pin_ptr_[i], HIGH);
        sleep(channel_data_.delay_time_);
        set(config_data_ptr_->header.pin_ptr_[i], LOW);
    }

    off();
}"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_nonempty() {
        assert!(!default_javascript_code().is_empty());
        assert!(!default_cpp_code().is_empty());
    }
}
