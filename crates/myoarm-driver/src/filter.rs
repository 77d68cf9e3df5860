//! 均值滤波
//!
//! 固定 N=3 窗口、环形下标回绕。与设备端实现保持同一语义：
//! 滤波输出写回当前槽位（后续窗口在平滑后的值上继续平均），
//! 窗口初始为零填充，起步阶段输出向零偏置。

/// 均值滤波窗口长度
pub const MEAN_FILTER_LEN: usize = 3;

/// u16 通道均值滤波（ADC 电压值）
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanFilterU16 {
    buf: [u16; MEAN_FILTER_LEN],
    idx: usize,
}

impl MeanFilterU16 {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推入一个采样，返回窗口均值
    pub fn push(&mut self, sample: u16) -> u16 {
        self.idx = (self.idx + 1) % MEAN_FILTER_LEN;
        self.buf[self.idx] = sample;

        let sum: u32 = self.buf.iter().map(|&v| v as u32).sum();
        let mean = (sum / MEAN_FILTER_LEN as u32) as u16;

        // 滤波结果写回当前槽位
        self.buf[self.idx] = mean;
        mean
    }

    /// 清空窗口
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// f32 通道均值滤波（陀螺仪角度/角速度）
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanFilterF32 {
    buf: [f32; MEAN_FILTER_LEN],
    idx: usize,
}

impl MeanFilterF32 {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推入一个采样，返回窗口均值
    pub fn push(&mut self, sample: f32) -> f32 {
        self.idx = (self.idx + 1) % MEAN_FILTER_LEN;
        self.buf[self.idx] = sample;

        let mean = self.buf.iter().sum::<f32>() / MEAN_FILTER_LEN as f32;

        self.buf[self.idx] = mean;
        mean
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
