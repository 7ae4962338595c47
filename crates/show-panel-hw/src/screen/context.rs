//! Screen context: session state, command buffering and paced transmit.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{self, AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info};

use crate::color::{Color, ColorMode};
use crate::orientation::Orientation;
use crate::{Error, Result, BAUD_RATE, ROTATION_NORTH};

use super::buttons::{poll_buttons, ButtonEvent, ButtonId, CallbackTable};
use super::protocol::{self, ArrowDirection};

/// Pause per transmitted byte. The link has no flow control and the
/// firmware drops bytes under burst load at 500 kbaud, so this constant
/// is tuned to its receive rate.
const PACE_PER_BYTE: Duration = Duration::from_millis(6);

/// Factory defaults the firmware boots with.
const DEFAULT_TEXT_SIZE: u32 = 2;
const DEFAULT_FOREGROUND: Color = Color::White;
const DEFAULT_BACKGROUND: Color = Color::Black;
const BACKLIGHT_MAX: u8 = 255;

/// Controller for one display session.
///
/// Tracks the cursor column, orientation, text size and colors, since
/// several encodings depend on them, and owns the output buffer. In
/// buffered mode (the default) commands are queued until [`flush`];
/// otherwise each command is written through immediately. Either way
/// every write is paced.
///
/// [`flush`]: ScreenContext::flush
pub struct ScreenContext<T> {
    writer: WriteHalf<T>,
    /// Read half of the transport; taken by the poll task on first
    /// callback registration.
    reader: Option<ReadHalf<T>>,
    buffered: bool,
    buffer: Vec<Vec<u8>>,
    orientation: Orientation,
    text_size: u32,
    foreground: Color,
    background: Color,
    cursor_column: u32,
    callbacks: Arc<Mutex<CallbackTable>>,
    poll_task: Option<JoinHandle<()>>,
}

impl ScreenContext<SerialStream> {
    /// Opens the display on a serial port (500000 baud, 8 data bits).
    pub fn open(path: &str, buffered: bool) -> Result<Self> {
        let port = tokio_serial::new(path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .open_native_async()?;

        info!("display opened at {} ({} baud)", path, BAUD_RATE);
        Ok(Self::new(port, buffered))
    }
}

impl<T> ScreenContext<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wraps an already-open transport. `buffered` selects whether
    /// commands are queued until [`flush`] or written through
    /// immediately; the mode is fixed for the session.
    ///
    /// [`flush`]: ScreenContext::flush
    pub fn new(transport: T, buffered: bool) -> Self {
        let (reader, writer) = io::split(transport);
        Self {
            writer,
            reader: Some(reader),
            buffered,
            buffer: Vec::new(),
            orientation: Orientation::default(),
            text_size: DEFAULT_TEXT_SIZE,
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
            cursor_column: 0,
            callbacks: Arc::new(Mutex::new(CallbackTable::default())),
            poll_task: None,
        }
    }

    /// Queues a raw sequence in buffered mode, or writes it through.
    pub async fn write_raw_sequence(&mut self, sequence: Vec<u8>) -> Result<()> {
        if self.buffered {
            self.buffer.push(sequence);
            Ok(())
        } else {
            Self::write_paced(&mut self.writer, &sequence).await
        }
    }

    /// Writes one command, then pauses in proportion to its length so
    /// the device input buffer is never overrun.
    async fn write_paced(writer: &mut WriteHalf<T>, bytes: &[u8]) -> Result<()> {
        writer.write_all(bytes).await?;
        tokio::time::sleep(PACE_PER_BYTE * bytes.len() as u32).await;
        Ok(())
    }

    /// Transmits all queued commands in enqueue order, then clears the
    /// queue. No-op when the queue is empty.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        for command in &self.buffer {
            Self::write_paced(&mut self.writer, command).await?;
        }
        debug!("flushed {} queued commands", self.buffer.len());
        self.buffer.clear();
        Ok(())
    }

    /// Drops queued commands without transmitting them.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Queued commands joined into one byte string, in transmission
    /// order. Useful for inspecting a pending batch.
    pub fn buffered_bytes(&self) -> Vec<u8> {
        self.buffer.concat()
    }

    // Fixed single-sequence commands.

    pub async fn new_line(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::NEW_LINE.to_vec()).await
    }

    pub async fn carriage_return(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::CARRIAGE_RETURN.to_vec())
            .await
    }

    pub async fn cursor_down(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::CURSOR_DOWN.to_vec()).await
    }

    pub async fn cursor_down_column_one(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::CURSOR_DOWN_COLUMN_ONE.to_vec())
            .await
    }

    pub async fn cursor_up(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::CURSOR_UP.to_vec()).await
    }

    pub async fn reset_lcd(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::RESET_LCD.to_vec()).await
    }

    pub async fn erase_screen(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::ERASE_SCREEN.to_vec())
            .await
    }

    pub async fn save_cursor_position(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::SAVE_CURSOR.to_vec()).await
    }

    pub async fn restore_cursor_position(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::RESTORE_CURSOR.to_vec())
            .await
    }

    // Parameterized cursor motion.

    pub async fn keyboard_arrow_up(&mut self, count: u32) -> Result<()> {
        self.write_raw_sequence(protocol::arrow(ArrowDirection::Up, count))
            .await
    }

    pub async fn keyboard_arrow_down(&mut self, count: u32) -> Result<()> {
        self.write_raw_sequence(protocol::arrow(ArrowDirection::Down, count))
            .await
    }

    pub async fn keyboard_arrow_right(&mut self, count: u32) -> Result<()> {
        self.write_raw_sequence(protocol::arrow(ArrowDirection::Right, count))
            .await
    }

    pub async fn keyboard_arrow_left(&mut self, count: u32) -> Result<()> {
        self.write_raw_sequence(protocol::arrow(ArrowDirection::Left, count))
            .await
    }

    /// Moves the cursor to an absolute position.
    pub async fn set_cursor_position(&mut self, row: u32, col: u32) -> Result<()> {
        self.write_raw_sequence(protocol::cursor_position(row, col))
            .await
    }

    /// Homes the cursor. The firmware silently reverts its color state
    /// on home, so both colors are re-issued right after.
    pub async fn cursor_to_home(&mut self) -> Result<()> {
        self.write_raw_sequence(protocol::CURSOR_HOME.to_vec())
            .await?;
        self.write_color(ColorMode::Foreground, self.foreground)
            .await?;
        self.write_color(ColorMode::Background, self.background)
            .await?;
        self.cursor_column = 0;
        Ok(())
    }

    // Backlight.

    /// Sets backlight brightness on the raw 0-255 PWM scale.
    pub async fn set_backlight_brightness_pwm(&mut self, pwm: u8) -> Result<()> {
        self.write_raw_sequence(protocol::backlight_pwm(pwm)).await
    }

    /// Sets backlight brightness as a 0-100 percentage, rounded onto the
    /// PWM scale.
    pub async fn set_backlight_brightness_percent(&mut self, percent: u8) -> Result<()> {
        self.set_backlight_brightness_pwm(protocol::percent_to_pwm(percent))
            .await
    }

    // Colors.

    async fn write_color(&mut self, mode: ColorMode, color: Color) -> Result<()> {
        self.write_raw_sequence(protocol::color(mode, color)).await
    }

    /// Sets the text color. Unknown names fail with
    /// [`Error::InvalidColor`] before anything is written or changed.
    pub async fn set_foreground_color(&mut self, name: &str) -> Result<()> {
        let color: Color = name.parse()?;
        self.write_color(ColorMode::Foreground, color).await?;
        self.foreground = color;
        Ok(())
    }

    /// Sets the background color. Unknown names fail with
    /// [`Error::InvalidColor`] before anything is written or changed.
    pub async fn set_background_color(&mut self, name: &str) -> Result<()> {
        let color: Color = name.parse()?;
        self.write_color(ColorMode::Background, color).await?;
        self.background = color;
        Ok(())
    }

    // Rotation and text size.

    /// Sets the display rotation. Even codes put the panel in vertical
    /// orientation, odd codes in horizontal (firmware contract). The
    /// cursor column is kept.
    pub async fn set_rotation(&mut self, code: u8) -> Result<()> {
        self.write_raw_sequence(protocol::rotation(code)).await?;
        self.orientation = Orientation::from_rotation(code);
        Ok(())
    }

    /// Sets the text scale factor. Column and row counts change with it.
    pub async fn set_text_size(&mut self, size: u32) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidTextSize(size));
        }
        self.write_raw_sequence(protocol::text_size(size)).await?;
        self.text_size = size;
        Ok(())
    }

    // Text.

    /// Writes text in runs of at most 20 characters (the serial link
    /// cannot take longer single writes) and advances the tracked cursor
    /// column, wrapping at the current column count.
    pub async fn write_text(&mut self, text: &str) -> Result<()> {
        for chunk in protocol::chunk_text(text) {
            self.write_raw_sequence(chunk.as_bytes().to_vec()).await?;
        }
        let columns = self.columns().max(1);
        self.cursor_column = (self.cursor_column + text.chars().count() as u32) % columns;
        Ok(())
    }

    /// Writes text and fills the rest of the row with spaces so earlier
    /// content cannot show through.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        let width = self.columns().saturating_sub(self.cursor_column) as usize;
        self.write_text(&format!("{text:<width$}")).await
    }

    /// Moves to a new row: carriage return plus newline.
    pub async fn linebreak(&mut self) -> Result<()> {
        self.carriage_return().await?;
        self.new_line().await?;
        self.cursor_column = 0;
        Ok(())
    }

    /// Blanks `rows - start` rows, starting `start` rows below home.
    pub async fn erase_rows(&mut self, start: u32, rows: u32) -> Result<()> {
        self.cursor_to_home().await?;
        for _ in 0..start {
            self.linebreak().await?;
        }
        let blank = " ".repeat(self.columns() as usize + 1).into_bytes();
        for _ in start..rows {
            self.write_raw_sequence(blank.clone()).await?;
        }
        Ok(())
    }

    // Graphics.

    /// Draws a single pixel.
    pub async fn draw_dot(&mut self, x: u32, y: u32) -> Result<()> {
        self.write_raw_sequence(protocol::draw_dot(x, y)).await
    }

    /// Draws pre-formatted RGB565 pixel data. The payload is passed
    /// through untouched; only the header depends on orientation.
    pub async fn draw_image(
        &mut self,
        pixel_data: &[u8],
        offset_x: u32,
        offset_y: u32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.write_raw_sequence(protocol::image_header(
            self.orientation,
            offset_x,
            offset_y,
            width,
            height,
        ))
        .await?;
        self.write_raw_sequence(pixel_data.to_vec()).await
    }

    // Composite operations.

    /// Full screen reset: LCD reset, erase, home.
    pub async fn reset_screen(&mut self) -> Result<()> {
        self.reset_lcd().await?;
        self.erase_screen().await?;
        self.cursor_to_home().await
    }

    /// Returns the display to its canonical known state: default text
    /// size and rotation, carriage return, full backlight, default
    /// colors. Transmits immediately when buffered. The firmware relies
    /// on this exact command order.
    pub async fn restore_defaults(&mut self) -> Result<()> {
        self.set_text_size(DEFAULT_TEXT_SIZE).await?;
        self.set_rotation(ROTATION_NORTH).await?;
        self.carriage_return().await?;
        self.set_backlight_brightness_pwm(BACKLIGHT_MAX).await?;
        self.write_color(ColorMode::Foreground, DEFAULT_FOREGROUND)
            .await?;
        self.foreground = DEFAULT_FOREGROUND;
        self.write_color(ColorMode::Background, DEFAULT_BACKGROUND)
            .await?;
        self.background = DEFAULT_BACKGROUND;
        if self.buffered {
            self.flush().await?;
        }
        Ok(())
    }

    // Button callbacks.

    /// Registers a handler for a (button, event) slot; the last
    /// registration for a slot wins. The background poll task starts on
    /// the first registration and takes over the transport read half
    /// from then on.
    pub fn on_button<F>(&mut self, button: ButtonId, event: ButtonEvent, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks
            .lock()
            .unwrap()
            .set(button, event, Box::new(callback));

        if let Some(reader) = self.reader.take() {
            debug!("starting button poll task");
            self.poll_task = Some(tokio::spawn(poll_buttons(
                reader,
                Arc::clone(&self.callbacks),
            )));
        }
    }

    /// True once the background poll task has started.
    pub fn is_polling(&self) -> bool {
        self.poll_task.is_some()
    }

    /// Stops the poll task and waits for it to finish. Without this call
    /// the task runs until the session or runtime is torn down.
    pub async fn stop_polling(&mut self) {
        if let Some(task) = self.poll_task.take() {
            debug!("stopping button poll task");
            task.abort();
            let _ = task.await;
        }
    }

    // Session state accessors.

    /// Columns available at the current orientation and text size.
    pub fn columns(&self) -> u32 {
        self.orientation.columns(self.text_size)
    }

    /// Rows available at the current orientation and text size.
    pub fn rows(&self) -> u32 {
        self.orientation.rows(self.text_size)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn text_size(&self) -> u32 {
        self.text_size
    }

    pub fn foreground_color(&self) -> Color {
        self.foreground
    }

    pub fn background_color(&self) -> Color {
        self.background
    }

    pub fn cursor_column(&self) -> u32 {
        self.cursor_column
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, DuplexStream};

    fn buffered_context() -> (ScreenContext<DuplexStream>, DuplexStream) {
        let (client, device) = tokio::io::duplex(4096);
        (ScreenContext::new(client, true), device)
    }

    async fn read_exactly(device: &mut DuplexStream, len: usize) -> Vec<u8> {
        let mut received = vec![0u8; len];
        device.read_exact(&mut received).await.unwrap();
        received
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffered_scenario_transmits_in_order() {
        let (mut ctx, mut device) = buffered_context();

        ctx.erase_screen().await.unwrap();
        ctx.set_rotation(0).await.unwrap();
        assert_eq!(ctx.orientation(), Orientation::Vertical);
        ctx.set_foreground_color("red").await.unwrap();
        ctx.write_text("Hi").await.unwrap();

        let expected = b"\x1b[2J\x1b[0r\x1b[31mHi";
        assert_eq!(ctx.buffered_bytes(), expected);

        ctx.flush().await.unwrap();
        assert!(ctx.buffered_bytes().is_empty());

        let sent = read_exactly(&mut device, expected.len()).await;
        assert_eq!(sent, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_on_empty_buffer_is_noop() {
        let (mut ctx, _device) = buffered_context();
        ctx.flush().await.unwrap();
        assert!(ctx.buffered_bytes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbuffered_writes_through() {
        let (client, mut device) = tokio::io::duplex(4096);
        let mut ctx = ScreenContext::new(client, false);

        ctx.erase_screen().await.unwrap();
        assert!(ctx.buffered_bytes().is_empty());

        let sent = read_exactly(&mut device, 4).await;
        assert_eq!(sent, b"\x1b[2J");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_color_changes_nothing() {
        let (mut ctx, _device) = buffered_context();

        let result = ctx.set_foreground_color("chartreuse").await;
        assert!(matches!(result, Err(Error::InvalidColor(_))));
        assert_eq!(ctx.foreground_color(), Color::White);
        assert!(ctx.buffered_bytes().is_empty());

        let result = ctx.set_background_color("ultraviolet").await;
        assert!(matches!(result, Err(Error::InvalidColor(_))));
        assert_eq!(ctx.background_color(), Color::Black);
        assert!(ctx.buffered_bytes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_text_size_rejected() {
        let (mut ctx, _device) = buffered_context();
        assert!(matches!(
            ctx.set_text_size(0).await,
            Err(Error::InvalidTextSize(0))
        ));
        assert_eq!(ctx.text_size(), 2);
        assert!(ctx.buffered_bytes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_column_wraps() {
        let (mut ctx, _device) = buffered_context();
        // Horizontal at size 2: 26 columns.
        assert_eq!(ctx.columns(), 26);

        ctx.write_text("Hi").await.unwrap();
        assert_eq!(ctx.cursor_column(), 2);

        ctx.write_text(&"x".repeat(30)).await.unwrap();
        assert_eq!(ctx.cursor_column(), (2 + 30) % 26);
        assert!(ctx.cursor_column() < ctx.columns());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_text_chunks_long_input() {
        let (mut ctx, mut device) = buffered_context();
        let text = "a".repeat(45);
        ctx.write_text(&text).await.unwrap();

        // Three separate queued sequences: 20 + 20 + 5.
        assert_eq!(ctx.buffered_bytes().len(), 45);
        ctx.flush().await.unwrap();
        let sent = read_exactly(&mut device, 45).await;
        assert_eq!(sent, text.as_bytes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_line_pads_remaining_columns() {
        let (mut ctx, _device) = buffered_context();

        ctx.write_line("Hi").await.unwrap();
        let sent = ctx.buffered_bytes();
        assert_eq!(sent.len(), 26);
        assert!(sent.starts_with(b"Hi"));
        assert!(sent[2..].iter().all(|&b| b == b' '));
        assert_eq!(ctx.cursor_column(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_to_home_reasserts_colors() {
        let (mut ctx, _device) = buffered_context();
        ctx.set_foreground_color("red").await.unwrap();
        ctx.set_background_color("blue").await.unwrap();
        ctx.write_text("abc").await.unwrap();
        ctx.clear_buffer();

        ctx.cursor_to_home().await.unwrap();
        assert_eq!(ctx.buffered_bytes(), b"\x1b[H\x1b[31m\x1b[44m");
        assert_eq!(ctx.cursor_column(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_linebreak_resets_column() {
        let (mut ctx, _device) = buffered_context();
        ctx.write_text("abc").await.unwrap();
        ctx.linebreak().await.unwrap();
        assert_eq!(ctx.cursor_column(), 0);
        assert!(ctx.buffered_bytes().ends_with(b"\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_defaults_exact_sequence() {
        let (mut ctx, mut device) = buffered_context();
        // Perturb state first so defaults actually change something.
        ctx.set_text_size(3).await.unwrap();
        ctx.set_rotation(1).await.unwrap();
        ctx.set_foreground_color("green").await.unwrap();
        ctx.clear_buffer();

        ctx.restore_defaults().await.unwrap();

        let expected: &[u8] = b"\x1b[2s\x1b[0r\r\x1b[255q\x1b[37m\x1b[40m";
        // restore_defaults flushes in buffered mode.
        assert!(ctx.buffered_bytes().is_empty());
        let sent = read_exactly(&mut device, expected.len()).await;
        assert_eq!(sent, expected);

        assert_eq!(ctx.text_size(), 2);
        assert_eq!(ctx.orientation(), Orientation::Vertical);
        assert_eq!(ctx.foreground_color(), Color::White);
        assert_eq!(ctx.background_color(), Color::Black);
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_image_swaps_axis_when_horizontal() {
        let (mut ctx, _device) = buffered_context();
        assert_eq!(ctx.orientation(), Orientation::Horizontal);

        let payload = [0xAAu8, 0xBB, 0xCC, 0xDD];
        ctx.draw_image(&payload, 0, 0, 240, 320).await.unwrap();
        let mut expected = b"\x1b[0;0,320;240i".to_vec();
        expected.extend_from_slice(&payload);
        assert_eq!(ctx.buffered_bytes(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_screen_sequence() {
        let (mut ctx, _device) = buffered_context();
        ctx.reset_screen().await.unwrap();
        assert_eq!(
            ctx.buffered_bytes(),
            b"\x1bc\x1b[2J\x1b[H\x1b[37m\x1b[40m"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_task_starts_once_and_dispatches() {
        let (client, mut device) = tokio::io::duplex(64);
        let mut ctx = ScreenContext::new(client, true);
        assert!(!ctx.is_polling());

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        ctx.on_button(ButtonId::Button0, ButtonEvent::Pressed, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(ctx.is_polling());

        // A second registration must not spawn another task.
        ctx.on_button(ButtonId::Button1, ButtonEvent::Released, || {});

        use tokio::io::AsyncWriteExt;
        device.write_all(b"0d").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        ctx.stop_polling().await;
        assert!(!ctx.is_polling());
    }
}
