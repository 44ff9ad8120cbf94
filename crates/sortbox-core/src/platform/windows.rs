const ERROR_NOT_SAME_DEVICE: i32 = 17;

pub fn is_not_same_device(code: i32) -> bool {
    code == ERROR_NOT_SAME_DEVICE
}
