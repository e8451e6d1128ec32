/// Generates byte-addressed accessors for a register stored as a fixed
/// `[u8; N]` field. Multi-byte accessors are big-endian (wire order) unless
/// the name says `le`.
macro_rules! impl_register_ops {
    ($struct_name:ident, $field_name:ident, $len:expr) => {
        impl $struct_name {
            pub const LEN: usize = $len;

            #[inline]
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.$field_name
            }

            #[inline]
            pub fn read_reg8(&self, offset: usize) -> u8 {
                self.$field_name[offset]
            }

            #[inline]
            pub fn read_reg16(&self, offset: usize) -> u16 {
                u16::from_be_bytes([self.$field_name[offset], self.$field_name[offset + 1]])
            }

            #[inline]
            pub fn read_reg32(&self, offset: usize) -> u32 {
                let mut b = [0u8; 4];
                b.copy_from_slice(&self.$field_name[offset..offset + 4]);
                u32::from_be_bytes(b)
            }

            #[inline]
            pub fn read_reg32_le(&self, offset: usize) -> u32 {
                let mut b = [0u8; 4];
                b.copy_from_slice(&self.$field_name[offset..offset + 4]);
                u32::from_le_bytes(b)
            }

            #[inline]
            pub fn write_reg8(&mut self, offset: usize, value: u8) {
                self.$field_name[offset] = value;
            }

            /// Read-modify-write of the bits selected by `mask`.
            #[inline]
            pub fn modify_reg8(&mut self, offset: usize, mask: u8, value: u8) {
                let old = self.$field_name[offset];
                self.$field_name[offset] = (old & !mask) | (value & mask);
            }

            #[inline]
            pub fn write_reg32(&mut self, offset: usize, value: u32) {
                self.$field_name[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
            }

            #[inline]
            pub fn write_reg32_le(&mut self, offset: usize, value: u32) {
                self.$field_name[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            }
        }
    };
}
