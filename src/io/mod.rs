//! External collaborator interfaces: button input, the presence-suppression
//! FIFO, the sensor snapshot file, and the audio peripheral.

pub mod audio;
pub mod buttons;
pub mod presence;
pub mod sensor;
